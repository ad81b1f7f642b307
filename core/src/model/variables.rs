//! Persistent state tensors bound to read/assign node pairs.
//!
//! The read and assign halves of a variable form a back-edge in the data
//! flow. The pair is deliberately not wired as an ordinary edge: it lives
//! in this side table, which the reshape engine consults after the acyclic
//! propagation pass so the traversal never sees a cycle.

use crate::model::{InletId, OutletId, PortFact};

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: String,
    /// Current shape and element type of the state tensor.
    pub fact: PortFact,
    /// Output port of the `ReadValue` node.
    pub read: OutletId,
    /// Input port of the `Assign` node.
    pub assign: InletId,
}
