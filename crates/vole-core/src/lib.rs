//! # vole-core
//!
//! Tensor primitives, engine capability traits and operator dispatch for vole.
//!
//! This crate provides:
//! - [`Tensor`]: n-dimensional array bound to an execution [`Engine`]
//! - [`Shape`] / [`Layout`]: shape, strides and memory layout
//! - [`DType`]: element types (F16, F32, F64, I64)
//! - [`Adder`], [`Suber`], [`Muler`], [`Diver`], [`Power`], [`Dotter`]:
//!   the capability traits an engine may implement
//! - [`arith`]: elementwise Add/Sub/Mul/Div/Pow over tensors and scalars
//! - [`linalg`]: MatMul, MatVecMul, Dot, Inner, Outer
//! - [`Im2Col`] / [`Col2Im`]: convolution lowering to GEMM
//!
//! Arithmetic is never executed by this crate directly. Each call resolves
//! the capability on an operand's engine and delegates to it; see
//! `vole-cpu` for the reference engine.

// - DType / Scalar: element types and single typed values
// - Shape / Layout: n-dimensional shape and strided views
// - Storage / Tensor: typed buffers behind a shared lock
// - Engine: capability probes
// - FuncOpts: in-place / reuse / incr output control
// - arith / linalg / conv: the operator surface

pub mod arith;
pub mod conv;
pub mod dense;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod layout;
pub mod linalg;
pub mod operand;
pub mod options;
pub mod scalar;
pub mod shape;
pub mod storage;
pub mod tensor;
pub mod validate;

pub use half::f16;

pub use conv::{col2im, im2col, Col2Im, Im2Col, PatchParams};
pub use dtype::{DType, WithDType};
pub use engine::{
    Adder, Capability, Diver, Dotter, Engine, HostEngine, MemorySpace, Muler, Power, Side, Suber,
};
pub use error::{Error, ErrorKind, Result};
pub use layout::Layout;
pub use operand::Operand;
pub use options::FuncOpts;
pub use scalar::Scalar;
pub use shape::Shape;
pub use storage::Storage;
pub use tensor::Tensor;
