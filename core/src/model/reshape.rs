//! Load-time re-parameterization: assign new shapes to selected inputs
//! and re-propagate through the graph.

use crate::model::{Model, OutletId, Port, PortFact};
use crate::ops::{self, InferCtx, OpRegistry};
use itertools::Itertools;
use log::{debug, trace};
use std::collections::BTreeSet;
use weft_data::prelude::*;

/// Addresses one input port of a model: by position, by one of the port's
/// names, or by a handle previously obtained from the same model.
#[derive(Debug, Clone, PartialEq)]
pub enum ReshapeKey {
    Index(i64),
    Name(String),
    Port(Port),
}

impl From<i64> for ReshapeKey {
    fn from(ix: i64) -> ReshapeKey {
        ReshapeKey::Index(ix)
    }
}

impl From<usize> for ReshapeKey {
    fn from(ix: usize) -> ReshapeKey {
        ReshapeKey::Index(ix as i64)
    }
}

impl From<&str> for ReshapeKey {
    fn from(name: &str) -> ReshapeKey {
        ReshapeKey::Name(name.to_string())
    }
}

impl From<String> for ReshapeKey {
    fn from(name: String) -> ReshapeKey {
        ReshapeKey::Name(name)
    }
}

impl From<Port> for ReshapeKey {
    fn from(port: Port) -> ReshapeKey {
        ReshapeKey::Port(port)
    }
}

/// The reshape call surface: target shapes per input key, plus optional
/// per-variable state overrides.
#[derive(Debug, Clone, Default)]
pub struct ReshapeRequest {
    pub shapes: Vec<(ReshapeKey, PartialShape)>,
    pub variables: Vec<(String, PartialShape)>,
}

impl ReshapeRequest {
    pub fn new() -> ReshapeRequest {
        ReshapeRequest::default()
    }

    pub fn with_shape(mut self, key: impl Into<ReshapeKey>, shape: PartialShape) -> ReshapeRequest {
        self.shapes.push((key.into(), shape));
        self
    }

    pub fn with_variable(
        mut self,
        id: impl Into<String>,
        shape: PartialShape,
    ) -> ReshapeRequest {
        self.variables.push((id.into(), shape));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.variables.is_empty()
    }
}

impl Model {
    /// Reshapes the model in place, atomically: on error nothing changed.
    ///
    /// Each key resolves to a distinct input port; the port's shape is
    /// replaced with the target, then every downstream node's output
    /// shapes and types are re-inferred in topological order and the
    /// variable read/assign pairs are re-validated. The model keeps its
    /// instance identity, so previously minted [Port] handles still
    /// resolve after the call; shapes read through them before the call
    /// are stale.
    ///
    /// A variable whose override is omitted keeps its recorded state
    /// shape; if propagation makes the read/assign pair incompatible with
    /// it, the reshape fails rather than inventing a new state shape.
    pub fn reshape(&mut self, request: &ReshapeRequest) -> WeftResult<()> {
        self.reshape_with(request, ops::registry())
    }

    /// [Model::reshape] against a caller-supplied rule registry.
    pub fn reshape_with(
        &mut self,
        request: &ReshapeRequest,
        registry: &OpRegistry,
    ) -> WeftResult<()> {
        if request.is_empty() {
            return Err(WeftError::Argument(
                "reshape expects at least one target shape or variable override".to_string(),
            ));
        }
        let assignments = self.resolve_request(request)?;
        for (id, _) in &request.variables {
            if !self.variables.contains_key(id) {
                return Err(WeftError::NotFound(format!("model has no variable {id:?}")));
            }
        }

        let mut staged = self.staged_copy();
        let mut seeds: Vec<usize> = vec![];
        for (id, shape) in &request.variables {
            if let Some(var) = staged.variables.get_mut(id) {
                debug!("variable {id:?} state override: {} -> {shape}", var.fact.shape);
                var.fact.shape = shape.clone();
                seeds.push(var.read.node);
            }
        }
        for (outlet, shape) in &assignments {
            let element_type = staged.outlet_fact(*outlet)?.element_type;
            debug!("input {outlet:?} reshaped to {shape}");
            staged.set_outlet_fact(*outlet, PortFact::new(element_type, shape.clone()))?;
            seeds.push(outlet.node);
        }

        staged.propagate(registry, &seeds)?;
        staged.validate_variables()?;
        *self = staged;
        Ok(())
    }

    fn resolve_request(
        &self,
        request: &ReshapeRequest,
    ) -> WeftResult<Vec<(OutletId, PartialShape)>> {
        let mut resolved: Vec<(OutletId, PartialShape)> = vec![];
        for (key, shape) in &request.shapes {
            let outlet = self.resolve_key(key)?;
            if let Some((_, previous)) = resolved.iter().find(|(o, _)| *o == outlet) {
                if previous != shape {
                    return Err(WeftError::ConflictingShape(format!(
                        "input {outlet:?} targeted with both {previous} and {shape}"
                    )));
                }
                continue;
            }
            resolved.push((outlet, shape.clone()));
        }
        Ok(resolved)
    }

    fn resolve_key(&self, key: &ReshapeKey) -> WeftResult<OutletId> {
        match key {
            ReshapeKey::Index(ix) => {
                if *ix < 0 || *ix as usize >= self.input_count() {
                    return Err(WeftError::OutOfRange(format!(
                        "input index {ix} out of range, model has {} inputs",
                        self.input_count()
                    )));
                }
                Ok(self.input_outlets()[*ix as usize])
            }
            ReshapeKey::Name(name) => {
                let owners: Vec<OutletId> = self
                    .input_outlets()
                    .iter()
                    .filter(|o| self.names_of(**o).iter().any(|n| n == name))
                    .cloned()
                    .collect();
                match owners.len() {
                    0 => Err(WeftError::NotFound(format!("no model input named {name:?}"))),
                    1 => Ok(owners[0]),
                    n => Err(WeftError::AmbiguousName(format!(
                        "{n} model inputs share the name {name:?}"
                    ))),
                }
            }
            ReshapeKey::Port(port) => {
                let outlet = self.resolve_port(port)?;
                if !self.input_outlets().contains(&outlet) {
                    return Err(WeftError::NotFound(format!(
                        "port {outlet:?} is not a model input"
                    )));
                }
                Ok(outlet)
            }
        }
    }

    /// Re-runs shape inference over every node reachable from the seeds,
    /// in a deterministic topological order.
    fn propagate(&mut self, registry: &OpRegistry, seeds: &[usize]) -> WeftResult<()> {
        let mut reachable: BTreeSet<usize> = BTreeSet::new();
        let mut stack: Vec<usize> = seeds.to_vec();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for outlet in &self.node(id).outputs {
                for succ in &outlet.successors {
                    if !reachable.contains(&succ.node) {
                        stack.push(succ.node);
                    }
                }
            }
        }
        let inputs: Vec<usize> = self.input_outlets().iter().map(|o| o.node).collect();
        let targets: Vec<usize> = reachable.iter().cloned().collect();
        let order = super::order::eval_order_for_nodes(self.nodes(), &inputs, &targets)?;
        trace!("propagation order: {:?}", order);
        for id in order {
            let new_facts = {
                let node = self.node(id);
                let rule = registry.rule(node.op.kind()).ok_or_else(|| {
                    WeftError::Shape(format!(
                        "no shape inference rule registered for {} ({node})",
                        node.op.kind()
                    ))
                })?;
                let input_facts: TVec<&PortFact> = node
                    .inputs
                    .iter()
                    .map(|o| self.outlet_fact(*o))
                    .collect::<WeftResult<_>>()?;
                let ctx = InferCtx { node, inputs: input_facts, variables: &self.variables };
                rule(&ctx).map_err(|e| match e {
                    WeftError::Shape(msg) => WeftError::Shape(format!("inferring {node}: {msg}")),
                    other => other,
                })?
            };
            if new_facts.len() != self.node(id).outputs.len() {
                return Err(WeftError::Shape(format!(
                    "rule for {} produced {} facts for {} outputs",
                    self.node(id),
                    new_facts.len(),
                    self.node(id).outputs.len()
                )));
            }
            for (slot, fact) in new_facts.into_iter().enumerate() {
                let outlet = OutletId::new(id, slot);
                if self.outlet_fact(outlet)? != &fact {
                    trace!("refined {outlet:?}: {} -> {fact}", self.outlet_fact(outlet)?);
                }
                self.set_outlet_fact(outlet, fact)?;
            }
        }
        Ok(())
    }

    /// Unifies each variable's state fact with its read-side output and
    /// assign-side input; the narrowed fact becomes the new state fact.
    fn validate_variables(&mut self) -> WeftResult<()> {
        for id in self.variables.keys().cloned().sorted() {
            let Some(var) = self.variables.get(&id) else { continue };
            let read_fact = self.outlet_fact(var.read)?.clone();
            let feeding = *self
                .node(var.assign.node)
                .inputs
                .get(var.assign.slot)
                .ok_or_else(|| {
                    WeftError::OutOfRange(format!(
                        "assign side of variable {id:?} is not wired ({:?})",
                        var.assign
                    ))
                })?;
            let assign_fact = self.outlet_fact(feeding)?.clone();
            let read = var.read;
            let assign = var.assign;
            let unified = var
                .fact
                .unify(&read_fact)
                .and_then(|fact| fact.unify(&assign_fact))
                .map_err(|e| {
                    WeftError::Shape(format!(
                        "variable {id:?} state disagrees between read {read:?} and \
                         assign {assign:?}: {e}"
                    ))
                })?;
            if let Some(var) = self.variables.get_mut(&id) {
                var.fact = unified;
            }
        }
        Ok(())
    }
}
