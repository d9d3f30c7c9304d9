// Linear-algebra dispatch - MatMul, MatVecMul, Dot, Inner, Outer
//
// Dtype equality is checked before anything else. `dot` is routed through
// the `Dotter` capability (a's engine, then b's); the other operations go
// straight to the dense host kernels in `dense`, which reject tensors whose
// engine keeps its data off-host with `UnsupportedEngine`.

use crate::engine::Capability;
use crate::error::{Error, Result};
use crate::options::FuncOpts;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::validate;

/// Matrix product of two rank-2 tensors.
pub fn mat_mul(a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
    validate::same_dtype(a, b)?;
    opts.validate()?;
    tracing::trace!(lhs = %a.shape(), rhs = %b.shape(), "mat_mul");
    a.matmul(b, opts)
}

/// Product of a rank-2 tensor and a vector of matching length.
pub fn mat_vec_mul(a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
    validate::same_dtype(a, b)?;
    opts.validate()?;
    tracing::trace!(lhs = %a.shape(), rhs = %b.shape(), "mat_vec_mul");
    a.mat_vec_mul(b, opts)
}

/// Inner product of two vectors.
pub fn inner(a: &Tensor, b: &Tensor) -> Result<Scalar> {
    validate::same_dtype(a, b)?;
    a.inner(b)
}

/// Outer product of two vectors.
pub fn outer(a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
    validate::same_dtype(a, b)?;
    opts.validate()?;
    a.outer(b, opts)
}

/// The opinionated dot product.
///
/// Vector orientation is deliberately ignored:
/// - `(n,1) · (n,1)` is an inner product with a rank-0 result;
/// - `(m,n) · (1,n)` is a matrix-vector product with an `(m,1)` result;
/// - `(n,1) · (n,p)` is `Bᵀ·a` with a `(p,1)` result;
/// - two matrices give their matrix product.
pub fn dot(a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
    validate::same_dtype(a, b)?;
    opts.validate()?;
    let dotter = a
        .engine()
        .dotter()
        .or_else(|| b.engine().dotter())
        .ok_or_else(|| Error::CapabilityUnsupported {
            engine: format!("{}, {}", a.engine().name(), b.engine().name()),
            capability: Capability::Dot,
        })?;
    tracing::trace!(lhs = %a.shape(), rhs = %b.shape(), "dot");
    dotter.dot(a, b, opts)
}
