//! Value-level vocabulary for the weft model IR: axis dimensions, partial
//! shapes, element types and the structured error type shared by all weft
//! crates.

#[macro_use]
mod macros;

pub mod datum;
pub mod dim;
pub mod error;
pub mod shape;

/// A SmallVec instantiation with 4 embeddable values.
///
/// Used about everywhere in weft, for node inputs and outputs, port name
/// sets, or shape dimensions.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub mod prelude {
    pub use crate::datum::ElementType;
    pub use crate::dim::Dim;
    pub use crate::error::{WeftError, WeftResult};
    pub use crate::shape::PartialShape;
    pub use crate::tvec;
    pub use crate::TVec;
}
