//! Element-wise and contraction rules.

use crate::ops::InferCtx;
use crate::model::PortFact;
use itertools::EitherOrBoth::{Both, Left, Right};
use itertools::Itertools;
use weft_data::prelude::*;

/// Shape and type preserving.
pub fn unary(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(1)?;
    Ok(tvec!(ctx.inputs[0].clone()))
}

/// Two operands, NumPy-style broadcast over partial dimensions.
pub fn binary(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(2)?;
    let element_type = ctx.common_element_type()?;
    let shape = broadcast_shapes(&ctx.inputs[0].shape, &ctx.inputs[1].shape)?;
    Ok(tvec!(PortFact { element_type, shape }))
}

/// `[batch..., m, k] x [batch..., k, n] -> [batch..., m, n]`, batch
/// dimensions broadcasting, inner dimensions unifying.
pub fn matmul(ctx: &InferCtx) -> WeftResult<TVec<PortFact>> {
    ctx.expect_inputs(2)?;
    let element_type = ctx.common_element_type()?;
    let (a, b) = (&ctx.inputs[0].shape, &ctx.inputs[1].shape);
    let (Some(da), Some(db)) = (a.dims(), b.dims()) else {
        return Ok(tvec!(PortFact { element_type, shape: PartialShape::Rankless }));
    };
    if da.len() < 2 || db.len() < 2 {
        return Err(WeftError::Shape(format!(
            "{} needs operands of rank 2 or more, got {a} and {b}",
            ctx.node.op
        )));
    }
    let (m, ka) = (da[da.len() - 2], da[da.len() - 1]);
    let (kb, n) = (db[db.len() - 2], db[db.len() - 1]);
    ka.unify(&kb).map_err(|e| {
        WeftError::Shape(format!("inner dimensions of {a} and {b} do not agree: {e}"))
    })?;
    let batch_a: PartialShape = da[..da.len() - 2].iter().cloned().collect();
    let batch_b: PartialShape = db[..db.len() - 2].iter().cloned().collect();
    let batch = broadcast_shapes(&batch_a, &batch_b)?;
    // both batch operands are ranked, so the broadcast is too
    let mut dims: TVec<Dim> = batch.dims().unwrap_or_default().iter().cloned().collect();
    dims.push(m);
    dims.push(n);
    Ok(tvec!(PortFact { element_type, shape: PartialShape::Ranked(dims) }))
}

/// Broadcasts two partial shapes: right-aligned, a missing dimension acts
/// as 1, a dimension that is exactly 1 yields the other side, anything
/// else must intersect. A rank-less operand gives a rank-less result.
pub(crate) fn broadcast_shapes(
    a: &PartialShape,
    b: &PartialShape,
) -> WeftResult<PartialShape> {
    let (Some(da), Some(db)) = (a.dims(), b.dims()) else {
        return Ok(PartialShape::Rankless);
    };
    let mut dims: TVec<Dim> = da
        .iter()
        .rev()
        .zip_longest(db.iter().rev())
        .map(|pair| match pair {
            Both(x, y) => broadcast_dim(x, y),
            Left(x) | Right(x) => Ok(*x),
        })
        .collect::<WeftResult<_>>()
        .map_err(|e| WeftError::Shape(format!("can not broadcast {a} and {b}: {e}")))?;
    dims.reverse();
    Ok(PartialShape::Ranked(dims))
}

fn broadcast_dim(x: &Dim, y: &Dim) -> WeftResult<Dim> {
    if *x == Dim::Fixed(1) {
        Ok(*y)
    } else if *y == Dim::Fixed(1) {
        Ok(*x)
    } else {
        x.unify(y)
    }
}
