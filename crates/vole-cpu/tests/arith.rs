use std::sync::Arc;

use vole_core::{
    arith, Adder, Capability, DType, Engine, ErrorKind, FuncOpts, Result, Scalar, Side, Tensor,
};
use vole_cpu::CpuEngine;

fn cpu(data: Vec<f64>, shape: impl Into<vole_core::Shape>) -> Tensor {
    CpuEngine::from_vec(data, shape).unwrap()
}

fn approx_eq(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9, "{x} != {y}");
    }
}

/// Supports addition only, by delegating to the CPU kernels.
#[derive(Debug)]
struct AddOnlyEngine(CpuEngine);

impl Adder for AddOnlyEngine {
    fn add(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor> {
        self.0.add(a, b, opts)
    }
    fn add_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor> {
        self.0.add_scalar(t, s, side, opts)
    }
}

impl Engine for AddOnlyEngine {
    fn name(&self) -> &str {
        "add-only"
    }
    fn adder(&self) -> Option<&dyn Adder> {
        Some(self)
    }
}

fn add_only(data: Vec<f64>, shape: impl Into<vole_core::Shape>) -> Tensor {
    Tensor::from_vec(data, shape)
        .unwrap()
        .with_engine(Arc::new(AddOnlyEngine(CpuEngine::new())))
}

#[test]
fn add_then_sub_restores_operand() {
    let a = cpu(vec![1.5, -2.0, 3.25, 0.0, 1e6, -7.5], (2, 3));
    let b = cpu(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], (2, 3));
    let opts = FuncOpts::new();
    let sum = arith::add(&a, &b, &opts).unwrap();
    let back = arith::sub(&sum, &b, &opts).unwrap();
    approx_eq(&back.to_vec::<f64>().unwrap(), &a.to_vec::<f64>().unwrap());
}

#[test]
fn sub_preserves_operand_order() {
    let t = cpu(vec![1.0, 2.0, 3.0], 3);
    let opts = FuncOpts::new();
    let right = arith::sub(5.0, &t, &opts).unwrap();
    let left = arith::sub(&t, 5.0, &opts).unwrap();
    assert_eq!(right.to_vec::<f64>().unwrap(), vec![4.0, 3.0, 2.0]);
    assert_eq!(left.to_vec::<f64>().unwrap(), vec![-4.0, -3.0, -2.0]);
}

#[test]
fn div_and_pow_respect_side() {
    let t = cpu(vec![1.0, 2.0, 4.0], 3);
    let opts = FuncOpts::new();
    assert_eq!(
        arith::div(8.0, &t, &opts).unwrap().to_vec::<f64>().unwrap(),
        vec![8.0, 4.0, 2.0]
    );
    assert_eq!(
        arith::div(&t, 2.0, &opts).unwrap().to_vec::<f64>().unwrap(),
        vec![0.5, 1.0, 2.0]
    );
    assert_eq!(
        arith::pow(&t, 2.0, &opts).unwrap().to_vec::<f64>().unwrap(),
        vec![1.0, 4.0, 16.0]
    );
    assert_eq!(
        arith::pow(3.0, &t, &opts).unwrap().to_vec::<f64>().unwrap(),
        vec![3.0, 9.0, 81.0]
    );
}

#[test]
fn add_only_engine_rejects_mul() {
    let a = add_only(vec![1.0, 2.0], 2);
    let b = add_only(vec![3.0, 4.0], 2);
    let opts = FuncOpts::new();

    let sum = arith::add(&a, &b, &opts).unwrap();
    assert_eq!(sum.to_vec::<f64>().unwrap(), vec![4.0, 6.0]);
    assert_eq!(sum.engine().name(), "add-only");

    let err = arith::mul(&a, &b, &opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityUnsupported);
    assert_eq!(err.to_string(), "engine add-only does not support Mul");

    let err = arith::sub(&a, 1.0, &opts).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapabilityUnsupported);
    assert!(!a.engine().supports(Capability::Pow));
}

#[test]
fn second_operand_engine_is_consulted() {
    let a = add_only(vec![1.0, 2.0], 2);
    let b = cpu(vec![3.0, 4.0], 2);
    let prod = arith::mul(&a, &b, &FuncOpts::new()).unwrap();
    assert_eq!(prod.to_vec::<f64>().unwrap(), vec![3.0, 8.0]);
}

#[test]
fn mixed_operand_uses_only_tensor_engine() {
    let a = add_only(vec![1.0, 2.0], 2);
    assert_eq!(
        arith::mul(2.0, &a, &FuncOpts::new()).unwrap_err().kind(),
        ErrorKind::CapabilityUnsupported
    );
}

#[test]
fn equal_count_different_shape_is_mismatch() {
    let a = cpu(vec![1.0; 4], (2, 2));
    let b = cpu(vec![1.0; 4], (4, 1));
    let err = arith::add(&a, &b, &FuncOpts::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn dtype_mismatch_is_reported() {
    let a = cpu(vec![1.0; 2], 2);
    let b = CpuEngine::from_vec(vec![1.0f32; 2], 2).unwrap();
    assert_eq!(
        arith::add(&a, &b, &FuncOpts::new()).unwrap_err().kind(),
        ErrorKind::DtypeMismatch
    );
    assert_eq!(
        arith::add(&a, 1i64, &FuncOpts::new()).unwrap_err().kind(),
        ErrorKind::DtypeMismatch
    );
}

#[test]
fn in_place_aliases_first_operand() {
    let a = cpu(vec![1.0, 2.0, 3.0], 3);
    let alias = a.clone();
    let b = cpu(vec![10.0, 20.0, 30.0], 3);
    let r = arith::add(&a, &b, &FuncOpts::new().in_place()).unwrap();
    assert!(r.shares_storage(&a));
    assert_eq!(alias.to_vec::<f64>().unwrap(), vec![11.0, 22.0, 33.0]);
    assert_eq!(b.to_vec::<f64>().unwrap(), vec![10.0, 20.0, 30.0]);
}

#[test]
fn in_place_scalar_on_right_overwrites_tensor() {
    let t = cpu(vec![1.0, 2.0, 3.0], 3);
    let r = arith::sub(5.0, &t, &FuncOpts::new().in_place()).unwrap();
    assert!(r.shares_storage(&t));
    assert_eq!(t.to_vec::<f64>().unwrap(), vec![4.0, 3.0, 2.0]);
}

#[test]
fn in_place_self_aliasing() {
    let a = cpu(vec![1.0, 2.0, 3.0], 3);
    arith::mul(&a, &a, &FuncOpts::new().in_place()).unwrap();
    assert_eq!(a.to_vec::<f64>().unwrap(), vec![1.0, 4.0, 9.0]);
}

#[test]
fn in_place_through_transposed_view() {
    let a = cpu(vec![1.0, 2.0, 3.0, 4.0], (2, 2));
    let at = a.t().unwrap();
    let ones = cpu(vec![0.0, 0.0, 100.0, 100.0], (2, 2));
    arith::add(&at, &ones, &FuncOpts::new().in_place()).unwrap();
    // at = [[1,3],[2,4]] + [[0,0],[100,100]] written back through the view
    assert_eq!(at.to_vec::<f64>().unwrap(), vec![1.0, 3.0, 102.0, 104.0]);
    assert_eq!(a.to_vec::<f64>().unwrap(), vec![1.0, 102.0, 3.0, 104.0]);
}

#[test]
fn reuse_and_incr() {
    let a = cpu(vec![1.0, 2.0], 2);
    let b = cpu(vec![3.0, 4.0], 2);
    let out = CpuEngine::zeros(2, DType::F64).unwrap();

    let r = arith::add(&a, &b, &FuncOpts::new().with_reuse(out.clone())).unwrap();
    assert!(r.shares_storage(&out));
    assert_eq!(out.to_vec::<f64>().unwrap(), vec![4.0, 6.0]);

    arith::add(&a, &b, &FuncOpts::new().with_reuse(out.clone()).incr()).unwrap();
    assert_eq!(out.to_vec::<f64>().unwrap(), vec![8.0, 12.0]);

    let wrong = CpuEngine::zeros(3, DType::F64).unwrap();
    assert_eq!(
        arith::add(&a, &b, &FuncOpts::new().with_reuse(wrong))
            .unwrap_err()
            .kind(),
        ErrorKind::ShapeMismatch
    );
}

#[test]
fn conflicting_options_are_invalid() {
    let a = cpu(vec![1.0], 1);
    let out = CpuEngine::zeros(1, DType::F64).unwrap();
    let opts = FuncOpts::new().in_place().with_reuse(out);
    assert_eq!(
        arith::add(&a, &a, &opts).unwrap_err().kind(),
        ErrorKind::InvalidConfiguration
    );
    let opts = FuncOpts::new().incr();
    assert_eq!(
        arith::add(&a, &a, &opts).unwrap_err().kind(),
        ErrorKind::InvalidConfiguration
    );
}

#[test]
fn integer_arithmetic() {
    let a = CpuEngine::from_vec(vec![7i64, -3, 10], 3).unwrap();
    let opts = FuncOpts::new();
    assert_eq!(
        arith::sub(5i64, &a, &opts).unwrap().to_vec::<i64>().unwrap(),
        vec![-2, 8, -5]
    );
    assert_eq!(
        arith::div(&a, 2i64, &opts).unwrap().to_vec::<i64>().unwrap(),
        vec![3, -1, 5]
    );
    assert!(arith::div(10i64, &CpuEngine::zeros(3, DType::I64).unwrap(), &opts).is_err());
}

#[test]
fn large_tensors_use_parallel_path() {
    let n = vole_cpu::PAR_THRESHOLD + 17;
    let a = CpuEngine::from_vec((0..n).map(|v| v as f32).collect(), n).unwrap();
    let r = arith::mul(&a, 2.0f32, &FuncOpts::new()).unwrap();
    let data = r.to_vec::<f32>().unwrap();
    assert_eq!(data.len(), n);
    assert_eq!(data[n - 1], 2.0 * (n - 1) as f32);
}
