use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::options::FuncOpts;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

// Engine - pluggable execution context
//
// Every tensor carries an `Arc<dyn Engine>`. The engine decides which kernel
// runs an operation, but it does not have to support every operation: the
// arithmetic families are split into narrow capability traits and an engine
// advertises the ones it implements through the probe methods on `Engine`.
//
//   impl Adder for MyEngine { ... }
//   impl Engine for MyEngine {
//       fn name(&self) -> &str { "mine" }
//       fn adder(&self) -> Option<&dyn Adder> { Some(self) }
//   }
//
// `arith::mul` on a tensor bound to MyEngine then fails with
// `CapabilityUnsupported` instead of silently falling back somewhere else.
//
// Engines are shared and read-only: every method takes `&self`.

/// One arithmetic family an engine may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Dot,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which side of a mixed tensor/scalar operation holds the tensor.
///
/// `Side::Left` means `tensor op scalar`, `Side::Right` means
/// `scalar op tensor`. Sub, Div and Pow depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Where an engine keeps tensor data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemorySpace {
    /// Ordinary process memory, readable by the dense kernels in this crate.
    Host,
    /// Memory owned by an accelerator, identified by name.
    Device(String),
}

/// Elementwise addition.
pub trait Adder: Send + Sync {
    fn add(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
    fn add_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor>;
}

/// Elementwise subtraction.
pub trait Suber: Send + Sync {
    fn sub(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
    fn sub_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor>;
}

/// Elementwise multiplication.
pub trait Muler: Send + Sync {
    fn mul(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
    fn mul_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor>;
}

/// Elementwise division.
pub trait Diver: Send + Sync {
    fn div(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
    fn div_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor>;
}

/// Elementwise exponentiation.
pub trait Power: Send + Sync {
    fn pow(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
    fn pow_scalar(&self, t: &Tensor, s: Scalar, side: Side, opts: &FuncOpts) -> Result<Tensor>;
}

/// The opinionated `dot` product (see [`crate::linalg::dot`]).
pub trait Dotter: Send + Sync {
    fn dot(&self, a: &Tensor, b: &Tensor, opts: &FuncOpts) -> Result<Tensor>;
}

/// An execution engine. Capability probes default to "not supported".
pub trait Engine: Send + Sync + fmt::Debug {
    /// A human-readable name (e.g., "cpu").
    fn name(&self) -> &str;

    fn memory(&self) -> MemorySpace {
        MemorySpace::Host
    }

    fn adder(&self) -> Option<&dyn Adder> {
        None
    }

    fn suber(&self) -> Option<&dyn Suber> {
        None
    }

    fn muler(&self) -> Option<&dyn Muler> {
        None
    }

    fn diver(&self) -> Option<&dyn Diver> {
        None
    }

    fn power(&self) -> Option<&dyn Power> {
        None
    }

    fn dotter(&self) -> Option<&dyn Dotter> {
        None
    }

    /// Whether this engine advertises `cap`.
    fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::Add => self.adder().is_some(),
            Capability::Sub => self.suber().is_some(),
            Capability::Mul => self.muler().is_some(),
            Capability::Div => self.diver().is_some(),
            Capability::Pow => self.power().is_some(),
            Capability::Dot => self.dotter().is_some(),
        }
    }
}

/// Host-memory engine with no arithmetic capabilities.
///
/// Freshly allocated tensors are bound to it; rebind them to a computing
/// engine with [`Tensor::with_engine`] before dispatching arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostEngine;

impl HostEngine {
    /// The process-wide shared instance.
    pub fn shared() -> Arc<dyn Engine> {
        static HOST: OnceLock<Arc<dyn Engine>> = OnceLock::new();
        HOST.get_or_init(|| Arc::new(HostEngine)).clone()
    }
}

impl Engine for HostEngine {
    fn name(&self) -> &str {
        "host"
    }
}
