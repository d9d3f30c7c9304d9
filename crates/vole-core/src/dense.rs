// Dense linear algebra - the host implementation behind `linalg`
//
// These are the concrete kernels for MatMul, MatVecMul, Inner, Outer and
// Dot. They read tensors through their layouts (transposed views work),
// compute in the tensor's own element type and deliver through
// `FuncOpts::write_result`.
//
// DOT IS OPINIONATED:
//
//   Vectors come as (n), column (n, 1) or row (1, n). `dot` ignores the
//   orientation of vectors instead of requiring aligned shapes:
//
//     (n,1) . (n,1)  -> inner product, rank-0 result (as if (1,n)·(n,1))
//     (m,n) . (1,n)  -> matrix-vector product, result (m, 1)
//     (n,1) . (n,p)  -> Bᵀ·a, result (p, 1)
//     (m,k) . (k,p)  -> matrix product
//
//   A rank-1 vector operand gives a rank-1 result instead of (m, 1)/(p, 1).
//   Callers rely on this behaviour; it is not a shape-checking bug.

use crate::dtype::WithDType;
use crate::engine::MemorySpace;
use crate::error::{Error, Result};
use crate::options::FuncOpts;
use crate::scalar::Scalar;
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::validate;

/// `acc + x * y`, failing when an integer result overflows.
#[inline]
fn mul_add<T: WithDType>(acc: T, x: T, y: T, op: &'static str) -> Result<T> {
    x.checked_mul(y)
        .and_then(|p| acc.checked_add(p))
        .ok_or(Error::IntegerOverflow { op })
}

/// Simple GEMM: C = A × B
///
/// A: [m, k], B: [k, n], C: [m, n], all row-major.
pub(crate) fn gemm<T: WithDType>(
    a: &[T],
    b: &[T],
    m: usize,
    n: usize,
    k: usize,
) -> Result<Vec<T>> {
    let mut c = vec![T::zero(); m * n];
    for i in 0..m {
        let a_row = i * k;
        let c_row = i * n;
        for p in 0..k {
            let a_val = a[a_row + p];
            let b_row = p * n;
            for j in 0..n {
                c[c_row + j] = mul_add(c[c_row + j], a_val, b[b_row + j], "matmul")?;
            }
        }
    }
    Ok(c)
}

/// y = A × x with A: [rows, cols] row-major.
pub(crate) fn gemv<T: WithDType>(a: &[T], x: &[T], rows: usize, cols: usize) -> Result<Vec<T>> {
    (0..rows)
        .map(|i| dot_slices(&a[i * cols..(i + 1) * cols], x))
        .collect()
}

pub(crate) fn dot_slices<T: WithDType>(a: &[T], b: &[T]) -> Result<T> {
    a.iter()
        .zip(b.iter())
        .try_fold(T::zero(), |acc, (&x, &y)| mul_add(acc, x, y, "dot"))
}

fn scaled<T: WithDType>(values: Vec<T>, factor: T, op: &'static str) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| v.checked_mul(factor).ok_or(Error::IntegerOverflow { op }))
        .collect()
}

fn host_only(t: &Tensor, op: &'static str) -> Result<()> {
    match t.engine().memory() {
        MemorySpace::Host => Ok(()),
        MemorySpace::Device(_) => Err(Error::UnsupportedEngine {
            op,
            engine: t.engine().name().to_string(),
        }),
    }
}

fn check_pair(a: &Tensor, b: &Tensor, op: &'static str) -> Result<()> {
    validate::same_dtype(a, b)?;
    host_only(a, op)?;
    host_only(b, op)
}

impl Tensor {
    /// Matrix product `[m, k] @ [k, n] -> [m, n]`.
    pub fn matmul(&self, rhs: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        check_pair(self, rhs, "matmul")?;
        validate::rank(self, 2)?;
        validate::rank(rhs, 2)?;
        let (m, k1) = (self.dims()[0], self.dims()[1]);
        let (k2, n) = (rhs.dims()[0], rhs.dims()[1]);
        if k1 != k2 {
            return Err(Error::MatmulShapeMismatch { m, k1, k2, n });
        }
        let storage = crate::with_dtype!(self.dtype(), T => {
            let a = self.to_vec::<T>()?;
            let b = rhs.to_vec::<T>()?;
            T::into_storage(gemm(&a, &b, m, n, k1)?)
        });
        opts.write_result(self, storage, Shape::from((m, n)))
    }

    /// Matrix-vector product `[m, n] @ v -> [m]` where `v` is any vector of
    /// length `n`.
    pub fn mat_vec_mul(&self, rhs: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        check_pair(self, rhs, "mat_vec_mul")?;
        validate::rank(self, 2)?;
        let len = validate::vector_len(rhs)?;
        let (m, n) = (self.dims()[0], self.dims()[1]);
        if len != n {
            return Err(Error::ShapeMismatch {
                expected: Shape::from(n),
                got: rhs.shape().clone(),
            });
        }
        self.gemv_into(rhs, m, n, Shape::from(m), opts)
    }

    /// Inner product of two vectors of equal length.
    pub fn inner(&self, rhs: &Tensor) -> Result<Scalar> {
        check_pair(self, rhs, "inner")?;
        let (la, lb) = (validate::vector_len(self)?, validate::vector_len(rhs)?);
        if la != lb {
            return Err(Error::ShapeMismatch {
                expected: self.shape().clone(),
                got: rhs.shape().clone(),
            });
        }
        crate::with_dtype!(self.dtype(), T => {
            let a = self.to_vec::<T>()?;
            let b = rhs.to_vec::<T>()?;
            Ok(dot_slices(&a, &b)?.into_scalar())
        })
    }

    /// Outer product of two vectors: `[len(a), len(b)]`.
    pub fn outer(&self, rhs: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        check_pair(self, rhs, "outer")?;
        let (la, lb) = (validate::vector_len(self)?, validate::vector_len(rhs)?);
        let storage = crate::with_dtype!(self.dtype(), T => {
            let a = self.to_vec::<T>()?;
            let b = rhs.to_vec::<T>()?;
            let mut out = Vec::with_capacity(la * lb);
            for &x in &a {
                out.extend(scaled(b.clone(), x, "outer")?);
            }
            T::into_storage(out)
        });
        opts.write_result(self, storage, Shape::from((la, lb)))
    }

    /// The opinionated dot product; see the module docs for the shape rules.
    pub fn dot(&self, rhs: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        check_pair(self, rhs, "dot")?;
        let (a, b) = (self.shape(), rhs.shape());

        if a.is_scalar() || b.is_scalar() {
            return self.scale_dot(rhs, opts);
        }
        if a.is_vector() && b.is_vector() {
            let value = self.inner(rhs)?;
            let storage = crate::with_dtype!(self.dtype(), T => {
                let v = value
                    .get::<T>()
                    .ok_or_else(|| Error::msg("inner product changed dtype"))?;
                T::into_storage(vec![v])
            });
            return opts.write_result(self, storage, Shape::from(()));
        }
        if a.is_vector() && b.is_matrix() {
            // Bᵀ·a: B is [n, p], a has length n
            let len = validate::vector_len(self)?;
            let (n, p) = (b.dims()[0], b.dims()[1]);
            if len != n {
                return Err(Error::ShapeMismatch {
                    expected: Shape::from(n),
                    got: a.clone(),
                });
            }
            let out_shape = if self.rank() == 2 {
                Shape::from((p, 1))
            } else {
                Shape::from(p)
            };
            return rhs.t()?.gemv_into_for(self, p, n, out_shape, opts, self);
        }
        if a.is_matrix() && b.is_vector() {
            let len = validate::vector_len(rhs)?;
            let (m, n) = (a.dims()[0], a.dims()[1]);
            if len != n {
                return Err(Error::ShapeMismatch {
                    expected: Shape::from(n),
                    got: b.clone(),
                });
            }
            let out_shape = if rhs.rank() == 2 {
                Shape::from((m, 1))
            } else {
                Shape::from(m)
            };
            return self.gemv_into(rhs, m, n, out_shape, opts);
        }
        if a.is_matrix() && b.is_matrix() {
            return self.matmul(rhs, opts);
        }
        Err(Error::ShapeMismatch {
            expected: a.clone(),
            got: b.clone(),
        })
    }

    fn gemv_into(
        &self,
        x: &Tensor,
        rows: usize,
        cols: usize,
        out_shape: Shape,
        opts: &FuncOpts,
    ) -> Result<Tensor> {
        self.gemv_into_for(x, rows, cols, out_shape, opts, self)
    }

    /// `self` is the [rows, cols] matrix, `first` the operand that receives an
    /// in-place result.
    fn gemv_into_for(
        &self,
        x: &Tensor,
        rows: usize,
        cols: usize,
        out_shape: Shape,
        opts: &FuncOpts,
        first: &Tensor,
    ) -> Result<Tensor> {
        let storage = crate::with_dtype!(self.dtype(), T => {
            let a = self.to_vec::<T>()?;
            let v = x.to_vec::<T>()?;
            T::into_storage(gemv(&a, &v, rows, cols)?)
        });
        opts.write_result(first, storage, out_shape)
    }

    /// Dot with a single-element operand: scale the other operand by it.
    fn scale_dot(&self, rhs: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        let (factor, values) = if self.shape().is_scalar() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let storage = crate::with_dtype!(self.dtype(), T => {
            let f = factor.to_vec::<T>()?[0];
            T::into_storage(scaled(values.to_vec::<T>()?, f, "dot")?)
        });
        opts.write_result(self, storage, values.shape().clone())
    }
}
