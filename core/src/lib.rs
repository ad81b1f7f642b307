//! # weft-core
//!
//! In-memory intermediate representation of a trained computation graph,
//! with partial shapes and load-time reshaping.
//!
//! A [model::Model] owns an arena of operation nodes connected by
//! producer-port to consumer-port edges. Every output port carries a
//! [weft_data::shape::PartialShape] and an element type. The model can be
//! re-parameterized after loading: [model::Model::reshape] assigns new
//! target shapes to selected input ports (addressed by position, name or
//! port handle) and re-propagates shapes through every downstream node,
//! keeping stateful variables consistent.
//!
//! ## Concurrency
//!
//! A model is plain owned data (`Send + Sync`). Mutators take `&mut self`,
//! so the single-writer/multi-reader discipline is enforced by the borrow
//! checker: queries may run concurrently with each other, never with an
//! in-flight mutation. Two independent models (a clone and its source)
//! share no storage and can be mutated from different threads freely.
//! No operation suspends or blocks; everything is a CPU-bound graph walk.

pub mod model;
pub mod ops;

pub use weft_data::error::{WeftError, WeftResult};

pub mod prelude {
    pub use crate::model::{
        InletId, Model, Node, Outlet, OutletId, Port, PortFact, ReshapeKey, ReshapeRequest,
        Variable,
    };
    pub use crate::ops::{InferCtx, Op, OpRegistry};
    pub use weft_data::prelude::*;
}
