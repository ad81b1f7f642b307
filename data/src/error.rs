//! Structured errors surfaced by every fallible weft operation.
//!
//! The binding layer is expected to match on the variant to pick a
//! host-native exception type; the message carries the offending
//! port/node/argument.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeftError {
    /// Wrong arity or argument type at a public operation.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Malformed shape or type text.
    #[error("parse error: {0}")]
    Parse(String),

    /// Index beyond bounds.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// No input port owns the requested name.
    #[error("no port found: {0}")]
    NotFound(String),

    /// More than one input port owns the requested name.
    #[error("ambiguous port name: {0}")]
    AmbiguousName(String),

    /// A port handle that does not belong to the model it was used with.
    #[error("foreign port: {0}")]
    ForeignPort(String),

    /// Incompatible shapes discovered during propagation or variable
    /// validation.
    #[error("shape error: {0}")]
    Shape(String),

    /// Two keys of one reshape request target the same port with different
    /// shapes.
    #[error("conflicting shapes: {0}")]
    ConflictingShape(String),
}

pub type WeftResult<T> = Result<T, WeftError>;
