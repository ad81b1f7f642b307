//! Element types carried by ports and variable states.

use crate::error::{WeftError, WeftResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl ElementType {
    /// The stable textual identifier for this type. Never empty.
    pub fn as_str(&self) -> &'static str {
        use ElementType::*;
        match self {
            Bool => "bool",
            U8 => "u8",
            U16 => "u16",
            U32 => "u32",
            U64 => "u64",
            I8 => "i8",
            I16 => "i16",
            I32 => "i32",
            I64 => "i64",
            F16 => "f16",
            F32 => "f32",
            F64 => "f64",
        }
    }

    pub fn size_of(&self) -> usize {
        use ElementType::*;
        match self {
            Bool | U8 | I8 => 1,
            U16 | I16 | F16 => 2,
            U32 | I32 | F32 => 4,
            U64 | I64 | F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::F16 | ElementType::F32 | ElementType::F64)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float() && *self != ElementType::Bool
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = WeftError;

    fn from_str(s: &str) -> WeftResult<ElementType> {
        use ElementType::*;
        Ok(match s {
            "bool" => Bool,
            "u8" => U8,
            "u16" => U16,
            "u32" => U32,
            "u64" => U64,
            "i8" => I8,
            "i16" => I16,
            "i32" => I32,
            "i64" => I64,
            "f16" => F16,
            "f32" => F32,
            "f64" => F64,
            _ => return Err(WeftError::Parse(format!("unknown element type {s:?}"))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip() {
        use ElementType::*;
        for dt in [Bool, U8, U16, U32, U64, I8, I16, I32, I64, F16, F32, F64] {
            assert!(!dt.as_str().is_empty());
            assert_eq!(dt.as_str().parse::<ElementType>().unwrap(), dt);
        }
    }

    #[test]
    fn rejects_unknown() {
        assert!(matches!("q7".parse::<ElementType>(), Err(WeftError::Parse(_))));
    }
}
