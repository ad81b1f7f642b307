//! Shape rules for tensor re-arrangement.

use crate::model::PortFact;
use crate::ops::{InferCtx, Op};
use weft_data::prelude::*;

/// All inputs share rank and element type; dimensions off the
/// concatenation axis unify, the axis dimension is the interval sum.
pub fn concat(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    let Op::Concat { axis } = ctx.node.op else {
        return Err(WeftError::Shape(format!("{} dispatched to the Concat rule", ctx.node.op)));
    };
    if ctx.inputs.is_empty() {
        return Err(WeftError::Shape("Concat expects at least one input".to_string()));
    }
    let element_type = ctx.common_element_type()?;
    let Some(shapes) =
        ctx.inputs.iter().map(|f| f.shape.dims()).collect::<Option<Vec<&[Dim]>>>()
    else {
        return Ok(tvec!(PortFact { element_type, shape: PartialShape::Rankless }));
    };
    let rank = shapes[0].len();
    if axis >= rank {
        return Err(WeftError::Shape(format!(
            "Concat axis {axis} out of range for rank {rank}"
        )));
    }
    let mut dims: TVec<Dim> = shapes[0].iter().cloned().collect();
    for (fact, other) in ctx.inputs[1..].iter().zip(&shapes[1..]) {
        if other.len() != rank {
            return Err(WeftError::Shape(format!(
                "Concat inputs disagree on rank: {} vs {}",
                ctx.inputs[0].shape, fact.shape
            )));
        }
        for (ix, dim) in dims.iter_mut().enumerate() {
            if ix == axis {
                *dim = *dim + other[ix];
            } else {
                *dim = dim.unify(&other[ix]).map_err(|e| {
                    WeftError::Shape(format!("Concat inputs disagree on axis {ix}: {e}"))
                })?;
            }
        }
    }
    Ok(tvec!(PortFact { element_type, shape: PartialShape::Ranked(dims) }))
}
