use crate::dtype::DType;
use crate::engine::Capability;
use crate::shape::Shape;

/// All errors that can occur within vole.
///
/// Every failure is returned to the immediate caller: operand shape and dtype
/// mismatches, missing engine capabilities, malformed configurations and
/// kernels that have no implementation for an element type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between two tensors (e.g., trying to add [2,2] + [4,1]).
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Operation requires a specific rank (number of dimensions).
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Matrix multiplication dimension mismatch.
    #[error("matmul shape mismatch: [{m}x{k1}] @ [{k2}x{n}], inner dims must match")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// DType mismatch between tensors in a binary operation.
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    /// A scalar operand does not have the tensor operand's dtype.
    #[error("scalar dtype {scalar} does not match tensor dtype {tensor}")]
    ScalarDTypeMismatch { tensor: DType, scalar: DType },

    /// None of the candidate engines advertise the required capability.
    #[error("engine {engine} does not support {capability}")]
    CapabilityUnsupported {
        engine: String,
        capability: Capability,
    },

    /// The tensor's engine cannot run the requested dense operation.
    #[error("{op} is not supported on engine {engine}")]
    UnsupportedEngine { op: &'static str, engine: String },

    /// The kernel has no implementation for this element type.
    #[error("{op} is not implemented for dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// An integer result does not fit the element type.
    #[error("integer overflow in {op}")]
    IntegerOverflow { op: &'static str },

    /// Parameters or options that cannot describe a valid computation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Element count mismatch when creating from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Dimension index out of range for the tensor's rank.
    #[error("dimension out of range: dim {dim} for tensor with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Tried to access a scalar from a non-scalar tensor.
    #[error("not a scalar: tensor has shape {shape}")]
    NotAScalar { shape: Shape },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

/// Coarse classification of an [`Error`].
///
/// Callers that only care about the family of a failure (a shape problem, a
/// missing capability, ...) can match on this instead of on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ShapeMismatch,
    DtypeMismatch,
    CapabilityUnsupported,
    InvalidConfiguration,
    UnsupportedDtype,
    UnsupportedEngine,
    Other,
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Create an `InvalidConfiguration` error.
    pub fn config(s: impl Into<String>) -> Self {
        Error::InvalidConfiguration(s.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShapeMismatch { .. }
            | Error::RankMismatch { .. }
            | Error::MatmulShapeMismatch { .. }
            | Error::ElementCountMismatch { .. }
            | Error::NotAScalar { .. } => ErrorKind::ShapeMismatch,
            Error::DTypeMismatch { .. } | Error::ScalarDTypeMismatch { .. } => {
                ErrorKind::DtypeMismatch
            }
            Error::CapabilityUnsupported { .. } => ErrorKind::CapabilityUnsupported,
            Error::UnsupportedEngine { .. } => ErrorKind::UnsupportedEngine,
            Error::UnsupportedDType { .. } => ErrorKind::UnsupportedDtype,
            Error::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Error::IntegerOverflow { .. } | Error::DimOutOfRange { .. } | Error::Msg(_) => {
                ErrorKind::Other
            }
        }
    }
}

/// Convenience Result type used throughout vole.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_shape_errors() {
        let e = Error::MatmulShapeMismatch {
            m: 2,
            k1: 3,
            k2: 4,
            n: 5,
        };
        assert_eq!(e.kind(), ErrorKind::ShapeMismatch);
        let e = Error::RankMismatch {
            expected: 4,
            got: 2,
        };
        assert_eq!(e.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_display() {
        let e = Error::ShapeMismatch {
            expected: Shape::from((2, 2)),
            got: Shape::from((4, 1)),
        };
        assert_eq!(e.to_string(), "shape mismatch: expected [2, 2], got [4, 1]");
        let e = Error::CapabilityUnsupported {
            engine: "add-only".into(),
            capability: Capability::Mul,
        };
        assert_eq!(e.to_string(), "engine add-only does not support Mul");
        let e = Error::IntegerOverflow { op: "mul" };
        assert_eq!(e.to_string(), "integer overflow in mul");
        assert_eq!(e.kind(), ErrorKind::Other);
    }
}
