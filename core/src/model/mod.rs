//! The graph container and everything addressed by node/slot indices.

mod graph;
mod node;
mod order;
mod reshape;
mod variables;

pub use self::graph::{Model, Port};
pub use self::node::{InletId, Node, Outlet, OutletId, PortFact};
pub use self::order::{eval_order, eval_order_for_nodes};
pub use self::reshape::{ReshapeKey, ReshapeRequest};
pub use self::variables::Variable;
