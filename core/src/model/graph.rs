use crate::model::variables::Variable;
use crate::model::{InletId, Node, Outlet, OutletId, PortFact};
use crate::ops::{self, InferCtx, Op};
use itertools::Itertools;
use log::trace;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use weft_data::prelude::*;

static INSTANCE_IDS: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    INSTANCE_IDS.fetch_add(1, Ordering::Relaxed)
}

/// A non-owning view on one boundary tensor slot of a [Model].
///
/// The handle remembers which model instance minted it: resolving it
/// through any other model fails with `ForeignPort`. Reshape keeps the
/// instance id (handles stay resolvable, their previously read shapes are
/// stale), cloning allocates a fresh one (handles never cross over).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Port {
    pub(crate) model: u64,
    pub(crate) outlet: OutletId,
}

impl Port {
    pub fn outlet(&self) -> OutletId {
        self.outlet
    }
}

/// The graph container.
///
/// Owns the node arena, the connecting edges (kept reciprocally as node
/// inputs and outlet successor lists), the ordered boundary ports, the
/// port name sets and the variable state registry. Nodes and ports are
/// addressed by stable indices, so deep-copying is a plain arena copy.
#[derive(Debug)]
pub struct Model {
    pub(crate) instance: u64,
    name: String,
    friendly_name: Option<String>,
    nodes: Vec<Node>,
    inputs: Vec<OutletId>,
    outputs: Vec<OutletId>,
    port_names: HashMap<OutletId, TVec<String>>,
    pub(crate) variables: HashMap<String, Variable>,
}

impl Model {
    /// An empty model. `name` is the immutable unique name; the friendly
    /// name defaults to it.
    pub fn new(name: impl Into<String>) -> Model {
        Model {
            instance: next_instance_id(),
            name: name.into(),
            friendly_name: None,
            nodes: vec![],
            inputs: vec![],
            outputs: vec![],
            port_names: HashMap::new(),
            variables: HashMap::new(),
        }
    }

    // building (loader boundary)

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: Op,
        output_facts: TVec<PortFact>,
    ) -> WeftResult<usize> {
        let name = name.into();
        let id = self.nodes.len();
        let outputs = output_facts.into_iter().map(Outlet::new).collect();
        trace!("adding node #{id} {name:?} ({op})");
        self.nodes.push(Node { id, name, op, inputs: vec![], outputs });
        Ok(id)
    }

    /// Connects a node outlet to a node inlet, keeping both half-edges in
    /// sync. Inlet slots must be wired in order and consecutively.
    pub fn add_edge(&mut self, outlet: OutletId, inlet: InletId) -> WeftResult<()> {
        if outlet.node >= self.nodes.len() || self.nodes[outlet.node].outputs.len() <= outlet.slot {
            return Err(WeftError::OutOfRange(format!("invalid outlet {outlet:?}")));
        }
        if inlet.node >= self.nodes.len() {
            return Err(WeftError::OutOfRange(format!("invalid inlet {inlet:?}")));
        }
        if let Some(previous) = self.nodes[inlet.node].inputs.get(inlet.slot).cloned() {
            self.nodes[previous.node].outputs[previous.slot]
                .successors
                .retain(|succ| *succ != inlet);
        }
        self.nodes[outlet.node].outputs[outlet.slot].successors.push(inlet);
        let succ = &mut self.nodes[inlet.node];
        if inlet.slot == succ.inputs.len() {
            succ.inputs.push(outlet);
        } else if inlet.slot < succ.inputs.len() {
            succ.inputs[inlet.slot] = outlet;
        } else {
            return Err(WeftError::Argument(format!(
                "edges must be added in order and consecutive, can not wire slot {} of {}",
                inlet.slot, succ
            )));
        }
        Ok(())
    }

    /// Adds a `Parameter` node and declares its output as the next model
    /// input.
    pub fn add_source(&mut self, name: impl Into<String>, fact: PortFact) -> WeftResult<OutletId> {
        let id = self.add_node(name, Op::Parameter, tvec!(fact))?;
        let id = OutletId::new(id, 0);
        self.inputs.push(id);
        Ok(id)
    }

    /// Adds a `Constant` node carrying the given fact.
    pub fn add_constant(
        &mut self,
        name: impl Into<String>,
        fact: PortFact,
    ) -> WeftResult<OutletId> {
        let id = self.add_node(name, Op::Constant, tvec!(fact))?;
        Ok(OutletId::new(id, 0))
    }

    /// Adds a node wired to `inputs`, running its shape-inference rule to
    /// seed the output facts. Single-output convenience for loaders and
    /// tests.
    pub fn wire_node(
        &mut self,
        name: impl Into<String>,
        op: Op,
        inputs: &[OutletId],
    ) -> WeftResult<OutletId> {
        let name = name.into();
        let facts = {
            let input_facts: TVec<&PortFact> =
                inputs.iter().map(|o| self.outlet_fact(*o)).collect::<WeftResult<_>>()?;
            let probe = Node {
                id: self.nodes.len(),
                name: name.clone(),
                op: op.clone(),
                inputs: inputs.to_vec(),
                outputs: tvec!(),
            };
            let ctx =
                InferCtx { node: &probe, inputs: input_facts, variables: &self.variables };
            let rule = ops::registry().rule(op.kind()).ok_or_else(|| {
                WeftError::Shape(format!("no shape inference rule registered for {}", op.kind()))
            })?;
            rule(&ctx)?
        };
        let id = self.add_node(name, op, facts)?;
        for (slot, outlet) in inputs.iter().enumerate() {
            self.add_edge(*outlet, InletId::new(id, slot))?;
        }
        Ok(OutletId::new(id, 0))
    }

    pub fn set_input_outlets(&mut self, inputs: &[OutletId]) -> WeftResult<()> {
        for i in inputs {
            self.outlet_fact(*i)?;
        }
        self.inputs = inputs.to_vec();
        Ok(())
    }

    pub fn set_output_outlets(&mut self, outputs: &[OutletId]) -> WeftResult<()> {
        for o in outputs {
            self.outlet_fact(*o)?;
        }
        self.outputs = outputs.to_vec();
        Ok(())
    }

    /// Attaches a human-readable name to a port. A port may carry several
    /// names, or none.
    pub fn add_port_name(&mut self, outlet: OutletId, name: impl Into<String>) -> WeftResult<()> {
        self.outlet_fact(outlet)?;
        self.port_names.entry(outlet).or_default().push(name.into());
        Ok(())
    }

    /// Declares a persistent variable state bound to a read/assign node
    /// pair.
    pub fn register_variable(
        &mut self,
        id: impl Into<String>,
        fact: PortFact,
        read: OutletId,
        assign: InletId,
    ) -> WeftResult<()> {
        let id = id.into();
        self.outlet_fact(read)?;
        if assign.node >= self.nodes.len() {
            return Err(WeftError::OutOfRange(format!("invalid inlet {assign:?}")));
        }
        self.variables.insert(id.clone(), Variable { id, fact, read, assign });
        Ok(())
    }

    // names

    /// The unique name, fixed at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The friendly name; falls back to the unique name while unset.
    pub fn friendly_name(&self) -> &str {
        self.friendly_name.as_deref().unwrap_or(&self.name)
    }

    /// Sets the friendly name. The empty string resets it to the unique
    /// name.
    pub fn set_friendly_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.friendly_name = if name.is_empty() { None } else { Some(name) };
    }

    // boundary ports

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&self, ix: usize) -> WeftResult<Port> {
        let outlet = *self.inputs.get(ix).ok_or_else(|| {
            WeftError::OutOfRange(format!(
                "input index {ix} out of range, model has {} inputs",
                self.inputs.len()
            ))
        })?;
        Ok(Port { model: self.instance, outlet })
    }

    pub fn output(&self, ix: usize) -> WeftResult<Port> {
        let outlet = *self.outputs.get(ix).ok_or_else(|| {
            WeftError::OutOfRange(format!(
                "output index {ix} out of range, model has {} outputs",
                self.outputs.len()
            ))
        })?;
        Ok(Port { model: self.instance, outlet })
    }

    pub fn inputs(&self) -> Vec<Port> {
        self.inputs.iter().map(|&outlet| Port { model: self.instance, outlet }).collect()
    }

    pub fn outputs(&self) -> Vec<Port> {
        self.outputs.iter().map(|&outlet| Port { model: self.instance, outlet }).collect()
    }

    pub fn output_element_type(&self, ix: usize) -> WeftResult<ElementType> {
        let port = self.output(ix)?;
        Ok(self.outlet_fact(port.outlet)?.element_type)
    }

    /// True iff any port anywhere in the graph carries a non-fully-static
    /// shape.
    pub fn is_dynamic(&self) -> bool {
        self.nodes.iter().flat_map(|n| n.outputs.iter()).any(|o| o.fact.shape.is_dynamic())
    }

    // port handles

    /// Checks a handle against this model and yields the underlying
    /// outlet.
    pub fn resolve_port(&self, port: &Port) -> WeftResult<OutletId> {
        if port.model != self.instance {
            return Err(WeftError::ForeignPort(format!(
                "port {:?} does not belong to model {:?}",
                port.outlet, self.name
            )));
        }
        self.outlet_fact(port.outlet)?;
        Ok(port.outlet)
    }

    pub fn port_fact(&self, port: &Port) -> WeftResult<&PortFact> {
        let outlet = self.resolve_port(port)?;
        self.outlet_fact(outlet)
    }

    pub fn port_shape(&self, port: &Port) -> WeftResult<&PartialShape> {
        Ok(&self.port_fact(port)?.shape)
    }

    pub fn port_names(&self, port: &Port) -> WeftResult<&[String]> {
        let outlet = self.resolve_port(port)?;
        Ok(self.port_names.get(&outlet).map(|names| &**names).unwrap_or(&[]))
    }

    // arena access

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: usize) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn input_outlets(&self) -> &[OutletId] {
        &self.inputs
    }

    pub fn output_outlets(&self) -> &[OutletId] {
        &self.outputs
    }

    pub fn outlet_fact(&self, outlet: OutletId) -> WeftResult<&PortFact> {
        self.nodes
            .get(outlet.node)
            .and_then(|n| n.outputs.get(outlet.slot))
            .map(|o| &o.fact)
            .ok_or_else(|| WeftError::OutOfRange(format!("invalid outlet {outlet:?}")))
    }

    pub fn set_outlet_fact(&mut self, outlet: OutletId, fact: PortFact) -> WeftResult<()> {
        let slot = self
            .nodes
            .get_mut(outlet.node)
            .and_then(|n| n.outputs.get_mut(outlet.slot))
            .ok_or_else(|| WeftError::OutOfRange(format!("invalid outlet {outlet:?}")))?;
        slot.fact = fact;
        Ok(())
    }

    pub fn variable(&self, id: &str) -> Option<&Variable> {
        self.variables.get(id)
    }

    pub fn variables(&self) -> &HashMap<String, Variable> {
        &self.variables
    }

    pub fn eval_order(&self) -> WeftResult<Vec<usize>> {
        super::order::eval_order(self)
    }

    /// Sanity pass over the reciprocal edge lists.
    pub fn check_edges(&self) -> WeftResult<()> {
        for node in &self.nodes {
            for (slot, input) in node.inputs.iter().enumerate() {
                let prec = &self.nodes[input.node];
                if !prec.outputs[input.slot].successors.contains(&InletId::new(node.id, slot)) {
                    return Err(WeftError::Argument(format!(
                        "incoming edge of {node} input {slot} not reciprocated by {prec}"
                    )));
                }
            }
            for (slot, output) in node.outputs.iter().enumerate() {
                for succ in &output.successors {
                    if self.nodes[succ.node].inputs.get(succ.slot)
                        != Some(&OutletId::new(node.id, slot))
                    {
                        return Err(WeftError::Argument(format!(
                            "outgoing edge of {node} output {slot} to {succ:?} not reciprocated"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Field-by-field copy keeping the instance identity. Only for the
    /// reshape engine's stage-then-commit discipline; everyone else goes
    /// through [Clone], which re-identifies the copy.
    pub(crate) fn staged_copy(&self) -> Model {
        Model {
            instance: self.instance,
            name: self.name.clone(),
            friendly_name: self.friendly_name.clone(),
            nodes: self.nodes.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            port_names: self.port_names.clone(),
            variables: self.variables.clone(),
        }
    }

    pub(crate) fn names_of(&self, outlet: OutletId) -> &[String] {
        self.port_names.get(&outlet).map(|names| &**names).unwrap_or(&[])
    }
}

/// An independent deep copy: same nodes, edges, facts, names and variable
/// states, but a fresh instance identity. The arena is index-addressed, so
/// this is a plain copy with no reference-graph walk. Mutating the clone
/// never affects the source and vice versa; port handles do not carry over.
impl Clone for Model {
    fn clone(&self) -> Model {
        let mut clone = self.staged_copy();
        clone.instance = next_instance_id();
        clone
    }
}

/// Structural and value equality; the instance identity is deliberately
/// ignored so that a clone compares equal to its source.
impl PartialEq for Model {
    fn eq(&self, other: &Model) -> bool {
        self.name == other.name
            && self.friendly_name == other.friendly_name
            && self.nodes == other.nodes
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.port_names == other.port_names
            && self.variables == other.variables
    }
}

impl fmt::Display for Model {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "model {:?} ({:?})", self.friendly_name(), self.name)?;
        for node in &self.nodes {
            writeln!(
                fmt,
                "{:4} | {:20} {:30} {} => {}",
                node.id,
                node.op.to_string(),
                node.name,
                node.inputs.iter().map(|i| format!("{}/{}", i.node, i.slot)).join(" "),
                node.outputs.iter().map(|o| o.fact.to_string()).join(" ; "),
            )?;
        }
        writeln!(
            fmt,
            "inputs: {}  outputs: {}",
            self.inputs.iter().map(|o| format!("{}/{}", o.node, o.slot)).join(" "),
            self.outputs.iter().map(|o| format!("{}/{}", o.node, o.slot)).join(" "),
        )
    }
}
