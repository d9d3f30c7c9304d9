// Operand validation
//
// Pure checks run before any dispatch. Nothing here coerces: a dtype or shape
// that does not match is reported, never adjusted. In particular shapes are
// compared exactly, so [2, 2] and [4, 1] are incompatible even though both
// hold four elements.

use crate::error::{Error, Result};
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Both tensors have the same dtype.
pub fn same_dtype(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.dtype() != b.dtype() {
        return Err(Error::DTypeMismatch {
            expected: a.dtype(),
            got: b.dtype(),
        });
    }
    Ok(())
}

/// Both tensors have exactly the same shape.
pub fn same_shape(a: &Tensor, b: &Tensor) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            expected: a.shape().clone(),
            got: b.shape().clone(),
        });
    }
    Ok(())
}

/// The scalar operand has the tensor's dtype.
pub fn scalar_dtype(t: &Tensor, s: &Scalar) -> Result<()> {
    if t.dtype() != s.dtype() {
        return Err(Error::ScalarDTypeMismatch {
            tensor: t.dtype(),
            scalar: s.dtype(),
        });
    }
    Ok(())
}

pub fn rank(t: &Tensor, expected: usize) -> Result<()> {
    if t.rank() != expected {
        return Err(Error::RankMismatch {
            expected,
            got: t.rank(),
        });
    }
    Ok(())
}

/// Length of `t` read as a vector: rank 1, or rank 2 with a unit dimension.
pub fn vector_len(t: &Tensor) -> Result<usize> {
    t.shape().vector_len().ok_or_else(|| Error::ShapeMismatch {
        expected: crate::Shape::from(t.elem_count()),
        got: t.shape().clone(),
    })
}
