//! Operation kinds and their shape-inference rules.
//!
//! Every node carries an [Op] tag; propagation looks the tag up in an
//! [OpRegistry] mapping it to a pure rule `(input facts) -> output facts`.
//! New operation kinds register a rule instead of subclassing anything.

use crate::model::{Node, PortFact, Variable};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use weft_data::prelude::*;

pub mod array;
pub mod math;
pub mod state;

/// Tagged operation variants, with per-kind attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// A declared graph input.
    Parameter,
    /// A weight or other load-time value.
    Constant,
    /// A declared graph output.
    Result,
    /// Element-wise, shape preserving.
    Unary,
    /// Element-wise over two operands with NumPy-style broadcast.
    Binary,
    Concat { axis: usize },
    MatMul,
    /// Reads the state tensor of the named variable.
    ReadValue { variable: String },
    /// Writes its input back to the named variable.
    Assign { variable: String },
}

impl Op {
    /// The registry tag selecting the shape-inference rule.
    pub fn kind(&self) -> &'static str {
        match self {
            Op::Parameter => "Parameter",
            Op::Constant => "Constant",
            Op::Result => "Result",
            Op::Unary => "Unary",
            Op::Binary => "Binary",
            Op::Concat { .. } => "Concat",
            Op::MatMul => "MatMul",
            Op::ReadValue { .. } => "ReadValue",
            Op::Assign { .. } => "Assign",
        }
    }

    /// Sources have no data inputs; their output facts are assigned, not
    /// inferred.
    pub fn is_source(&self) -> bool {
        matches!(self, Op::Parameter | Op::Constant)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::Concat { axis } => write!(fmt, "Concat(axis={axis})"),
            Op::ReadValue { variable } => write!(fmt, "ReadValue({variable})"),
            Op::Assign { variable } => write!(fmt, "Assign({variable})"),
            other => fmt.write_str(other.kind()),
        }
    }
}

/// Everything a shape-inference rule may look at.
pub struct InferCtx<'a> {
    pub node: &'a Node,
    pub inputs: TVec<&'a PortFact>,
    pub variables: &'a HashMap<String, Variable>,
}

impl<'a> InferCtx<'a> {
    pub fn expect_inputs(&self, count: usize) -> WeftResult<()> {
        if self.inputs.len() != count {
            return Err(WeftError::Shape(format!(
                "{} expects {count} inputs, got {}",
                self.node.op,
                self.inputs.len()
            )));
        }
        Ok(())
    }

    /// All inputs must agree on one element type.
    pub fn common_element_type(&self) -> WeftResult<ElementType> {
        let Some(first) = self.inputs.first() else {
            return Err(WeftError::Shape(format!("{} has no inputs to type", self.node.op)));
        };
        for fact in &self.inputs[1..] {
            if fact.element_type != first.element_type {
                return Err(WeftError::Shape(format!(
                    "{} inputs disagree on element type: {} vs {}",
                    self.node.op, first.element_type, fact.element_type
                )));
            }
        }
        Ok(first.element_type)
    }
}

pub type ShapeInferFn = fn(&InferCtx) -> WeftResult<TVec<PortFact>>;

/// Operation-kind tag to shape-inference rule mapping.
pub struct OpRegistry {
    rules: HashMap<&'static str, ShapeInferFn>,
}

impl OpRegistry {
    pub fn empty() -> OpRegistry {
        OpRegistry { rules: HashMap::new() }
    }

    pub fn register(&mut self, kind: &'static str, rule: ShapeInferFn) {
        self.rules.insert(kind, rule);
    }

    pub fn rule(&self, kind: &str) -> Option<ShapeInferFn> {
        self.rules.get(kind).copied()
    }
}

impl Default for OpRegistry {
    fn default() -> OpRegistry {
        let mut reg = OpRegistry::empty();
        reg.register("Parameter", state::source);
        reg.register("Constant", state::source);
        reg.register("Result", state::result);
        reg.register("Unary", math::unary);
        reg.register("Binary", math::binary);
        reg.register("Concat", array::concat);
        reg.register("MatMul", math::matmul);
        reg.register("ReadValue", state::read_value);
        reg.register("Assign", state::assign);
        reg
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: OpRegistry = OpRegistry::default();
}

/// The process-wide registry of built-in rules.
pub fn registry() -> &'static OpRegistry {
    &DEFAULT_REGISTRY
}
