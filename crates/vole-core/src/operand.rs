use half::f16;

use crate::engine::Side;
use crate::error::{Error, Result};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// One argument of a binary elementwise operation.
///
/// Built at the API boundary through `From`, so callers write
/// `arith::sub(5.0, &t, &opts)` or `arith::sub(&t, &u, &opts)`.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Tensor(&'a Tensor),
    Scalar(Scalar),
}

impl<'a> From<&'a Tensor> for Operand<'a> {
    fn from(t: &'a Tensor) -> Self {
        Operand::Tensor(t)
    }
}

impl From<Scalar> for Operand<'_> {
    fn from(s: Scalar) -> Self {
        Operand::Scalar(s)
    }
}

impl From<f16> for Operand<'_> {
    fn from(v: f16) -> Self {
        Operand::Scalar(Scalar::F16(v))
    }
}

impl From<f32> for Operand<'_> {
    fn from(v: f32) -> Self {
        Operand::Scalar(Scalar::F32(v))
    }
}

impl From<f64> for Operand<'_> {
    fn from(v: f64) -> Self {
        Operand::Scalar(Scalar::F64(v))
    }
}

impl From<i64> for Operand<'_> {
    fn from(v: i64) -> Self {
        Operand::Scalar(Scalar::I64(v))
    }
}

/// Operand roles, resolved once before dispatch.
#[derive(Debug)]
pub(crate) enum Roles<'a> {
    Tensors(&'a Tensor, &'a Tensor),
    Mixed {
        tensor: &'a Tensor,
        scalar: Scalar,
        side: Side,
    },
}

impl<'a> Roles<'a> {
    pub(crate) fn resolve(a: Operand<'a>, b: Operand<'a>) -> Result<Self> {
        match (a, b) {
            (Operand::Tensor(a), Operand::Tensor(b)) => Ok(Roles::Tensors(a, b)),
            (Operand::Tensor(tensor), Operand::Scalar(scalar)) => Ok(Roles::Mixed {
                tensor,
                scalar,
                side: Side::Left,
            }),
            (Operand::Scalar(scalar), Operand::Tensor(tensor)) => Ok(Roles::Mixed {
                tensor,
                scalar,
                side: Side::Right,
            }),
            (Operand::Scalar(_), Operand::Scalar(_)) => Err(Error::config(
                "at least one operand must be a tensor",
            )),
        }
    }
}
