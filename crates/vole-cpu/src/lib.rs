//! # vole-cpu
//!
//! The CPU engine for vole.
//!
//! [`CpuEngine`] implements every capability trait of `vole-core`:
//! elementwise Add/Sub/Mul/Div/Pow (parallel with rayon for large tensors)
//! and the opinionated `dot`, which runs on the dense host kernels.
//!
//! ```ignore
//! use vole_core::{arith, FuncOpts};
//! use vole_cpu::CpuEngine;
//!
//! let a = CpuEngine::from_vec(vec![1.0f64, 2.0, 3.0], 3)?;
//! let b = arith::sub(5.0, &a, &FuncOpts::new())?; // [4, 3, 2]
//! ```

pub mod ops;

use std::sync::{Arc, OnceLock};

use vole_core::{
    validate, with_dtype, Adder, Diver, Dotter, Engine, Error, FuncOpts, Muler, Power, Result,
    Scalar, Shape, Side, Suber, Tensor, WithDType,
};

pub use ops::{BinaryOp, PAR_THRESHOLD};

/// Host-memory engine with all arithmetic capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuEngine {
    par_threshold: usize,
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuEngine {
    pub fn new() -> Self {
        CpuEngine {
            par_threshold: PAR_THRESHOLD,
        }
    }

    /// Element count at or above which elementwise kernels use rayon.
    pub fn with_par_threshold(mut self, n: usize) -> Self {
        self.par_threshold = n;
        self
    }

    /// The process-wide shared instance with default settings.
    pub fn shared() -> Arc<dyn Engine> {
        static CPU: OnceLock<Arc<dyn Engine>> = OnceLock::new();
        CPU.get_or_init(|| Arc::new(CpuEngine::new())).clone()
    }

    /// A tensor from `data` bound to the shared CPU engine.
    pub fn from_vec<T: WithDType>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Tensor> {
        Ok(Tensor::from_vec(data, shape)?.with_engine(Self::shared()))
    }

    /// A zero-filled tensor bound to the shared CPU engine.
    pub fn zeros(shape: impl Into<Shape>, dtype: vole_core::DType) -> Result<Tensor> {
        Ok(Tensor::zeros(shape, dtype)?.with_engine(Self::shared()))
    }

    fn binary(&self, op: BinaryOp, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        validate::same_dtype(a, b)?;
        validate::same_shape(a, b)?;
        tracing::trace!(
            op = op.name(),
            shape = %a.shape(),
            dtype = %a.dtype(),
            "cpu binary kernel"
        );
        let threshold = self.par_threshold;
        let storage = with_dtype!(a.dtype(), T => {
            // copied out before any write lock is taken, so `b` may alias `a`
            let lhs = a.to_vec::<T>()?;
            let rhs = b.to_vec::<T>()?;
            T::into_storage(ops::binary(op, &lhs, &rhs, threshold)?)
        });
        opts.write_result(a, storage, a.shape().clone())
    }

    fn binary_scalar(
        &self,
        op: BinaryOp,
        t: &Tensor,
        s: Scalar,
        side: Side,
        opts: &FuncOpts,
    ) -> Result<Tensor> {
        validate::scalar_dtype(t, &s)?;
        tracing::trace!(
            op = op.name(),
            shape = %t.shape(),
            scalar = %s,
            side = ?side,
            "cpu scalar kernel"
        );
        let threshold = self.par_threshold;
        let storage = with_dtype!(t.dtype(), T => {
            let value = s.get::<T>().ok_or(Error::ScalarDTypeMismatch {
                tensor: t.dtype(),
                scalar: s.dtype(),
            })?;
            let data = t.to_vec::<T>()?;
            T::into_storage(ops::binary_scalar(op, &data, value, side, threshold)?)
        });
        opts.write_result(t, storage, t.shape().clone())
    }
}

macro_rules! cpu_capability {
    ($trait:ident, $name:ident, $scalar_name:ident, $op:expr) => {
        impl $trait for CpuEngine {
            fn $name(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
                self.binary($op, a, b, opts)
            }

            fn $scalar_name(
                &self,
                t: &Tensor,
                s: Scalar,
                side: Side,
                opts: &FuncOpts,
            ) -> Result<Tensor> {
                self.binary_scalar($op, t, s, side, opts)
            }
        }
    };
}

cpu_capability!(Adder, add, add_scalar, BinaryOp::Add);
cpu_capability!(Suber, sub, sub_scalar, BinaryOp::Sub);
cpu_capability!(Muler, mul, mul_scalar, BinaryOp::Mul);
cpu_capability!(Diver, div, div_scalar, BinaryOp::Div);
cpu_capability!(Power, pow, pow_scalar, BinaryOp::Pow);

impl Dotter for CpuEngine {
    fn dot(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        a.dot(b, opts)
    }
}

impl Engine for CpuEngine {
    fn name(&self) -> &str {
        "cpu"
    }

    fn adder(&self) -> Option<&dyn Adder> {
        Some(self)
    }

    fn suber(&self) -> Option<&dyn Suber> {
        Some(self)
    }

    fn muler(&self) -> Option<&dyn Muler> {
        Some(self)
    }

    fn diver(&self) -> Option<&dyn Diver> {
        Some(self)
    }

    fn power(&self) -> Option<&dyn Power> {
        Some(self)
    }

    fn dotter(&self) -> Option<&dyn Dotter> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vole_core::{arith, Capability, DType, ErrorKind};

    #[test]
    fn test_supports_everything() {
        let e = CpuEngine::new();
        for cap in [
            Capability::Add,
            Capability::Sub,
            Capability::Mul,
            Capability::Div,
            Capability::Pow,
            Capability::Dot,
        ] {
            assert!(e.supports(cap), "{cap}");
        }
        assert_eq!(e.name(), "cpu");
        assert_eq!(e.memory(), vole_core::MemorySpace::Host);
    }

    #[test]
    fn test_dispatch_through_arith() {
        let a = CpuEngine::from_vec(vec![1.0f64, 2.0, 3.0], 3).unwrap();
        let b = CpuEngine::from_vec(vec![4.0f64, 5.0, 6.0], 3).unwrap();
        let opts = FuncOpts::new();
        assert_eq!(
            arith::add(&a, &b, &opts).unwrap().to_vec::<f64>().unwrap(),
            vec![5.0, 7.0, 9.0]
        );
        assert_eq!(
            arith::mul(&a, &b, &opts).unwrap().to_vec::<f64>().unwrap(),
            vec![4.0, 10.0, 18.0]
        );
        assert_eq!(
            arith::div(&b, 2.0, &opts).unwrap().to_vec::<f64>().unwrap(),
            vec![2.0, 2.5, 3.0]
        );
        assert_eq!(
            arith::pow(2.0, &a, &opts).unwrap().to_vec::<f64>().unwrap(),
            vec![2.0, 4.0, 8.0]
        );
    }

    #[test]
    fn test_result_keeps_engine() {
        let a = CpuEngine::from_vec(vec![1.0f32, 2.0], 2).unwrap();
        let r = arith::add(&a, 1.0f32, &FuncOpts::new()).unwrap();
        assert_eq!(r.engine().name(), "cpu");
        // chained calls dispatch again on the same engine
        let r2 = arith::mul(&r, &r, &FuncOpts::new()).unwrap();
        assert_eq!(r2.to_vec::<f32>().unwrap(), vec![4.0, 9.0]);
    }

    #[test]
    fn test_integer_division_by_zero_is_error() {
        let a = CpuEngine::from_vec(vec![4i64, 6], 2).unwrap();
        let z = CpuEngine::zeros(2, DType::I64).unwrap();
        let err = arith::div(&a, &z, &FuncOpts::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(
            arith::div(&a, 2i64, &FuncOpts::new()).unwrap().to_vec::<i64>().unwrap(),
            vec![2, 3]
        );
    }

    #[test]
    fn test_integer_overflow_is_error() {
        let min = CpuEngine::from_vec(vec![i64::MIN], 1).unwrap();
        let err = arith::div(&min, -1i64, &FuncOpts::new()).unwrap_err();
        assert_eq!(err.to_string(), "integer overflow in div");

        let max = CpuEngine::from_vec(vec![i64::MAX], 1).unwrap();
        let err = arith::add(&max, 1i64, &FuncOpts::new()).unwrap_err();
        assert_eq!(err.to_string(), "integer overflow in add");
        assert!(arith::mul(&max, &max, &FuncOpts::new()).is_err());
        assert!(arith::sub(-2i64, &max, &FuncOpts::new()).is_err());
    }

    #[test]
    fn test_failed_in_place_op_leaves_operand() {
        let a = CpuEngine::from_vec(vec![1i64, i64::MAX], 2).unwrap();
        assert!(arith::add(&a, 1i64, &FuncOpts::new().in_place()).is_err());
        assert_eq!(a.to_vec::<i64>().unwrap(), vec![1, i64::MAX]);
    }

    #[test]
    fn test_integer_pow() {
        let a = CpuEngine::from_vec(vec![3i64], 1).unwrap();
        let r = arith::pow(&a, 39i64, &FuncOpts::new()).unwrap();
        assert_eq!(r.to_vec::<i64>().unwrap(), vec![4_052_555_153_018_976_267]);
        assert!(arith::pow(&a, -1i64, &FuncOpts::new()).is_err());
        assert!(arith::pow(&a, 40i64, &FuncOpts::new()).is_err());
    }

    #[test]
    fn test_f16_add() {
        use vole_core::f16;
        let a = CpuEngine::from_vec(vec![f16::from_f32(1.5), f16::from_f32(2.0)], 2).unwrap();
        let r = arith::add(&a, f16::from_f32(0.5), &FuncOpts::new()).unwrap();
        assert_eq!(r.to_f64_vec().unwrap(), vec![2.0, 2.5]);
    }

    #[test]
    fn test_custom_threshold_engine() {
        let engine: Arc<dyn Engine> = Arc::new(CpuEngine::new().with_par_threshold(1));
        let a = Tensor::from_vec((0..64).map(|v| v as f64).collect(), (8, 8))
            .unwrap()
            .with_engine(engine);
        let r = arith::sub(&a, &a, &FuncOpts::new()).unwrap();
        assert!(r.to_vec::<f64>().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_direct_kernel_call_validates() {
        let e = CpuEngine::new();
        let a = CpuEngine::from_vec(vec![1.0f64; 4], (2, 2)).unwrap();
        let b = CpuEngine::from_vec(vec![1.0f64; 4], (4, 1)).unwrap();
        assert_eq!(
            Adder::add(&e, &a, &b, &FuncOpts::new()).unwrap_err().kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(
            Adder::add_scalar(&e, &a, Scalar::I64(1), Side::Left, &FuncOpts::new())
                .unwrap_err()
                .kind(),
            ErrorKind::DtypeMismatch
        );
    }
}
