//! Per-axis size descriptors.

use crate::error::{WeftError, WeftResult};
use std::fmt;
use std::str::FromStr;

mod parse;
pub use self::parse::{parse_dim, parse_shape};

/// One axis of a tensor shape: a fixed size, a fully unknown size, or a
/// size bounded to an interval.
///
/// `Range(lo, hi)` always has `lo < hi`; a degenerate interval collapses to
/// `Fixed` at construction time so that `3..3` and `3` compare and print
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    Fixed(u64),
    Any,
    Range(u64, u64),
}

impl Dim {
    /// Builds a dimension from interval bounds, collapsing `lo == hi` to
    /// `Fixed(lo)`.
    pub fn range(lo: u64, hi: u64) -> WeftResult<Dim> {
        match lo.cmp(&hi) {
            std::cmp::Ordering::Less => Ok(Dim::Range(lo, hi)),
            std::cmp::Ordering::Equal => Ok(Dim::Fixed(lo)),
            std::cmp::Ordering::Greater => {
                Err(WeftError::Shape(format!("invalid dimension bounds {lo}..{hi}")))
            }
        }
    }

    /// Interval bounds, `None` standing for an unbounded upper end.
    fn bounds(&self) -> (u64, Option<u64>) {
        match *self {
            Dim::Fixed(n) => (n, Some(n)),
            Dim::Any => (0, None),
            Dim::Range(lo, hi) => (lo, Some(hi)),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Dim::Fixed(_))
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    /// Two dimensions are compatible when their intervals intersect.
    pub fn compatible_with(&self, other: &Dim) -> bool {
        let (alo, ahi) = self.bounds();
        let (blo, bhi) = other.bounds();
        ahi.map(|h| h >= blo).unwrap_or(true) && bhi.map(|h| h >= alo).unwrap_or(true)
    }

    /// Narrows two dimensions to their interval intersection.
    pub fn unify(&self, other: &Dim) -> WeftResult<Dim> {
        let (alo, ahi) = self.bounds();
        let (blo, bhi) = other.bounds();
        let lo = alo.max(blo);
        let hi = match (ahi, bhi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        match hi {
            Some(hi) if hi < lo => {
                Err(WeftError::Shape(format!("dimensions {self} and {other} are disjoint")))
            }
            Some(hi) => Dim::range(lo, hi),
            None if lo == 0 => Ok(Dim::Any),
            // Unbounded above but constrained below can not happen: Any is
            // the only unbounded variant and its lower bound is 0.
            None => Ok(Dim::Any),
        }
    }
}

/// Interval addition. An unbounded operand absorbs the other side.
impl std::ops::Add for Dim {
    type Output = Dim;

    fn add(self, rhs: Dim) -> Dim {
        let (alo, ahi) = self.bounds();
        let (blo, bhi) = rhs.bounds();
        match (ahi, bhi) {
            (Some(ahi), Some(bhi)) if alo + blo == ahi + bhi => Dim::Fixed(alo + blo),
            (Some(ahi), Some(bhi)) => Dim::Range(alo + blo, ahi + bhi),
            _ => Dim::Any,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(fmt, "{n}"),
            Dim::Any => write!(fmt, "?"),
            Dim::Range(lo, hi) => write!(fmt, "{lo}..{hi}"),
        }
    }
}

impl From<u64> for Dim {
    fn from(n: u64) -> Dim {
        Dim::Fixed(n)
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Dim {
        Dim::Fixed(n as u64)
    }
}

impl FromStr for Dim {
    type Err = WeftError;

    fn from_str(s: &str) -> WeftResult<Dim> {
        parse_dim(s)
    }
}
