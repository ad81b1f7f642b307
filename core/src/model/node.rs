use crate::ops::Op;
use std::fmt;
use weft_data::prelude::*;

/// Shape and element type carried by one output port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortFact {
    pub element_type: ElementType,
    pub shape: PartialShape,
}

impl PortFact {
    pub fn new(element_type: ElementType, shape: impl Into<PartialShape>) -> PortFact {
        PortFact { element_type, shape: shape.into() }
    }

    pub fn compatible_with(&self, other: &PortFact) -> bool {
        self.element_type == other.element_type && self.shape.compatible_with(&other.shape)
    }

    /// Narrows two facts carried by the same logical tensor slot.
    pub fn unify(&self, other: &PortFact) -> WeftResult<PortFact> {
        if self.element_type != other.element_type {
            return Err(WeftError::Shape(format!(
                "can not unify element types {} and {}",
                self.element_type, other.element_type
            )));
        }
        Ok(PortFact { element_type: self.element_type, shape: self.shape.unify(&other.shape)? })
    }
}

impl fmt::Display for PortFact {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}x{}", self.shape, self.element_type)
    }
}

/// Identifies an output port: producing node and slot rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutletId {
    pub node: usize,
    pub slot: usize,
}

impl OutletId {
    pub fn new(node: usize, slot: usize) -> OutletId {
        OutletId { node, slot }
    }
}

impl From<usize> for OutletId {
    fn from(node: usize) -> OutletId {
        OutletId::new(node, 0)
    }
}

impl From<(usize, usize)> for OutletId {
    fn from((node, slot): (usize, usize)) -> OutletId {
        OutletId::new(node, slot)
    }
}

/// Identifies an input port: consuming node and slot rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InletId {
    pub node: usize,
    pub slot: usize,
}

impl InletId {
    pub fn new(node: usize, slot: usize) -> InletId {
        InletId { node, slot }
    }
}

/// One output port of a node: its fact plus the inlets it feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlet {
    pub fact: PortFact,
    pub successors: TVec<InletId>,
}

impl Outlet {
    pub fn new(fact: PortFact) -> Outlet {
        Outlet { fact, successors: tvec!() }
    }
}

/// A vertex of the graph: an operation with wired inputs and fact-carrying
/// outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: usize,
    pub name: String,
    pub op: Op,
    pub inputs: Vec<OutletId>,
    pub outputs: TVec<Outlet>,
}

impl fmt::Display for Node {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "#{} {:?} ({})", self.id, self.name, self.op)
    }
}
