//! Partial tensor shapes.

use crate::dim::{parse_shape, Dim};
use crate::error::{WeftError, WeftResult};
use crate::TVec;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

/// An ordered sequence of [Dim]s of known rank, or a fully rank-less shape.
///
/// Once a rank is known it never changes under unification; only individual
/// dimensions narrow. The canonical text form is the bracketed one:
/// `[?,?,1..3,224]`, `[...]` when the rank itself is unknown, `[]` for a
/// scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PartialShape {
    #[default]
    Rankless,
    Ranked(TVec<Dim>),
}

impl PartialShape {
    /// A shape with every one of `rank` axes unconstrained.
    pub fn any_of_rank(rank: usize) -> PartialShape {
        PartialShape::Ranked(tvec!(Dim::Any; rank))
    }

    pub fn from_static(dims: &[usize]) -> PartialShape {
        dims.iter().map(|&d| Dim::from(d)).collect()
    }

    pub fn rank(&self) -> WeftResult<usize> {
        match self {
            PartialShape::Rankless => {
                Err(WeftError::Shape("rank of a rank-less shape is undefined".to_string()))
            }
            PartialShape::Ranked(dims) => Ok(dims.len()),
        }
    }

    pub fn dims(&self) -> Option<&[Dim]> {
        match self {
            PartialShape::Rankless => None,
            PartialShape::Ranked(dims) => Some(dims),
        }
    }

    pub fn dim(&self, ix: usize) -> Option<&Dim> {
        self.dims().and_then(|dims| dims.get(ix))
    }

    /// Fixed rank and every dimension fixed.
    pub fn is_static(&self) -> bool {
        match self {
            PartialShape::Rankless => false,
            PartialShape::Ranked(dims) => dims.iter().all(|d| d.is_static()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    /// Ranks match (or either side is rank-less) and every dimension pair
    /// intersects.
    pub fn compatible_with(&self, other: &PartialShape) -> bool {
        match (self.dims(), other.dims()) {
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compatible_with(y))
            }
            _ => true,
        }
    }

    /// Narrows two shapes into the most specific shape both agree on.
    pub fn unify(&self, other: &PartialShape) -> WeftResult<PartialShape> {
        match (self.dims(), other.dims()) {
            (None, _) => Ok(other.clone()),
            (_, None) => Ok(self.clone()),
            (Some(a), Some(b)) => {
                if a.len() != b.len() {
                    return Err(WeftError::Shape(format!(
                        "can not unify shapes of different ranks {self} and {other}"
                    )));
                }
                let dims: TVec<Dim> = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| x.unify(y))
                    .collect::<WeftResult<_>>()
                    .map_err(|e| {
                        WeftError::Shape(format!("unifying shapes {self} and {other}: {e}"))
                    })?;
                Ok(PartialShape::Ranked(dims))
            }
        }
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PartialShape::Rankless => write!(fmt, "[...]"),
            PartialShape::Ranked(dims) => {
                write!(fmt, "[{}]", dims.iter().map(|d| d.to_string()).join(","))
            }
        }
    }
}

impl FromStr for PartialShape {
    type Err = WeftError;

    fn from_str(s: &str) -> WeftResult<PartialShape> {
        parse_shape(s)
    }
}

impl FromIterator<Dim> for PartialShape {
    fn from_iter<I: IntoIterator<Item = Dim>>(iter: I) -> PartialShape {
        PartialShape::Ranked(iter.into_iter().collect())
    }
}

impl From<TVec<Dim>> for PartialShape {
    fn from(dims: TVec<Dim>) -> PartialShape {
        PartialShape::Ranked(dims)
    }
}

impl From<&[usize]> for PartialShape {
    fn from(dims: &[usize]) -> PartialShape {
        PartialShape::from_static(dims)
    }
}

impl<const N: usize> From<[usize; N]> for PartialShape {
    fn from(dims: [usize; N]) -> PartialShape {
        PartialShape::from_static(&dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_of_rankless_is_an_error() {
        assert!(PartialShape::Rankless.rank().is_err());
        assert_eq!(PartialShape::from([1, 4]).rank().unwrap(), 2);
    }

    #[test]
    fn staticness() {
        assert!(PartialShape::from([1, 3, 224, 224]).is_static());
        assert!(PartialShape::Ranked(tvec!()).is_static());
        assert!(!PartialShape::Rankless.is_static());
        assert!("[?,4]".parse::<PartialShape>().unwrap().is_dynamic());
        assert!("[1..3,4]".parse::<PartialShape>().unwrap().is_dynamic());
    }

    #[test]
    fn unify_against_rankless() {
        let s: PartialShape = "[1,4]".parse().unwrap();
        assert_eq!(PartialShape::Rankless.unify(&s).unwrap(), s);
        assert_eq!(s.unify(&PartialShape::Rankless).unwrap(), s);
    }

    #[test]
    fn unify_elementwise() {
        let a: PartialShape = "[?,2..6,4]".parse().unwrap();
        let b: PartialShape = "[8,4..9,?]".parse().unwrap();
        assert_eq!(a.unify(&b).unwrap().to_string(), "[8,4..6,4]");
    }

    #[test]
    fn unify_rank_mismatch() {
        let a: PartialShape = "[1,4]".parse().unwrap();
        let b: PartialShape = "[1,4,1]".parse().unwrap();
        assert!(matches!(a.unify(&b), Err(WeftError::Shape(_))));
    }

    #[test]
    fn compatibility() {
        let a: PartialShape = "[?,2..6,4]".parse().unwrap();
        assert!(a.compatible_with(&"[8,4,4]".parse().unwrap()));
        assert!(a.compatible_with(&PartialShape::Rankless));
        assert!(!a.compatible_with(&"[8,7,4]".parse().unwrap()));
        assert!(!a.compatible_with(&"[8,4]".parse().unwrap()));
    }
}
