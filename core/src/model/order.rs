use crate::model::{Model, Node};
use weft_data::prelude::*;

/// Computes an evaluation order covering the declared model outputs.
pub fn eval_order(model: &Model) -> WeftResult<Vec<usize>> {
    let inputs: Vec<usize> = model.input_outlets().iter().map(|n| n.node).collect();
    let targets: Vec<usize> = model.output_outlets().iter().map(|n| n.node).collect();
    eval_order_for_nodes(model.nodes(), &inputs, &targets)
}

/// Computes an evaluation order for the target nodes: every target appears
/// after all of its transitive predecessors, sources first.
pub fn eval_order_for_nodes(
    nodes: &[Node],
    inputs: &[usize],
    targets: &[usize],
) -> WeftResult<Vec<usize>> {
    let mut done = bit_set::BitSet::with_capacity(nodes.len());
    let mut pending = bit_set::BitSet::with_capacity(nodes.len());
    let mut needed: Vec<usize> = targets.to_vec();
    let mut order: Vec<usize> = vec![];
    while let Some(&node) = needed.last() {
        if done.contains(node) {
            needed.pop();
            continue;
        }
        if inputs.contains(&node) || nodes[node].inputs.iter().all(|i| done.contains(i.node)) {
            order.push(node);
            needed.pop();
            pending.remove(node);
            done.insert(node);
        } else {
            if pending.contains(node) {
                return Err(WeftError::Shape(format!(
                    "data-flow cycle detected through {}",
                    nodes[node]
                )));
            }
            pending.insert(node);
            for input in nodes[node].inputs.iter().rev() {
                if !done.contains(input.node) {
                    needed.push(input.node);
                }
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Op;

    fn fact() -> crate::model::PortFact {
        crate::model::PortFact::new(ElementType::F32, [2usize, 2])
    }

    #[test]
    fn chain_with_late_constant() {
        let mut model = Model::new("m");
        let a = model.add_source("a", fact()).unwrap();
        let add = model.add_node("add", Op::Binary, tvec!(fact())).unwrap();
        let b = model.add_constant("b", fact()).unwrap();
        model.add_edge(a, crate::model::InletId::new(add, 0)).unwrap();
        model.add_edge(b, crate::model::InletId::new(add, 1)).unwrap();
        model.set_output_outlets(&[crate::model::OutletId::new(add, 0)]).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec!(0, 2, 1));
    }

    #[test]
    fn diamond() {
        let mut model = Model::new("m");
        let a = model.add_source("a", fact()).unwrap();
        let add = model.wire_node("add", Op::Binary, &[a, a]).unwrap();
        model.set_output_outlets(&[add]).unwrap();
        assert_eq!(model.eval_order().unwrap(), vec!(0, 1));
    }
}
