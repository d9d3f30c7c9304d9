use std::fmt;

use half::f16;

use crate::dtype::{DType, WithDType};

/// A single typed value: the scalar side of a mixed tensor/scalar operation
/// and the result of `inner`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F16(f16),
    F32(f32),
    F64(f64),
    I64(i64),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::F16(_) => DType::F16,
            Scalar::F32(_) => DType::F32,
            Scalar::F64(_) => DType::F64,
            Scalar::I64(_) => DType::I64,
        }
    }

    /// The value widened to f64.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Scalar::F16(v) => v.to_f64(),
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
            Scalar::I64(v) => v as f64,
        }
    }

    /// The value as `T` if this scalar holds a `T`.
    pub fn get<T: WithDType>(&self) -> Option<T> {
        T::from_scalar(*self)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::F16(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
        }
    }
}

impl From<f16> for Scalar {
    fn from(v: f16) -> Self {
        Scalar::F16(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}
