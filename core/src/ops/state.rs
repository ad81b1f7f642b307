//! Rules for boundary and stateful nodes.

use crate::model::PortFact;
use crate::ops::{InferCtx, Op};
use weft_data::prelude::*;

/// Sources (Parameter, Constant) keep whatever facts were assigned to
/// their outputs; reshape overwrites those directly.
pub fn source(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(0)?;
    Ok(ctx.node.outputs.iter().map(|o| o.fact.clone()).collect())
}

/// Declared outputs mirror their single input.
pub fn result(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(1)?;
    Ok(tvec!(ctx.inputs[0].clone()))
}

/// The read side of a variable produces the current state fact.
pub fn read_value(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(0)?;
    let Op::ReadValue { variable } = &ctx.node.op else {
        return Err(WeftError::Shape(format!("{} dispatched to the ReadValue rule", ctx.node.op)));
    };
    let state = ctx.variables.get(variable).ok_or_else(|| {
        WeftError::Shape(format!("unknown variable {variable:?} read by {}", ctx.node))
    })?;
    Ok(tvec!(state.fact.clone()))
}

/// The assign side mirrors its input; consistency with the variable state
/// is enforced by the validation pass after propagation.
pub fn assign(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(1)?;
    Ok(tvec!(ctx.inputs[0].clone()))
}
