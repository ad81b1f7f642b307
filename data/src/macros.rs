#[macro_export]
macro_rules! tvec {
    ($elem:expr; $n:expr) => ({
        $crate::TVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        #[allow(unused_mut)]
        let mut vec = $crate::TVec::new();
        $(vec.push($x);)*
        vec
    });
}
