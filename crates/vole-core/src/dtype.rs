use std::fmt;

use half::f16;

use crate::scalar::Scalar;
use crate::storage::Storage;

// DType - Supported numeric data types
//
// Every tensor carries a DType so operations can dispatch to the correct
// typed kernel at runtime:
//
//   F16 - 16-bit IEEE half float
//   F32 - 32-bit float, the default workhorse
//   F64 - 64-bit float, for high-precision work
//   I64 - signed 64-bit int, for labels/indices

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F16,
    F32,
    F64,
    I64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F16 => 2,
            DType::F32 => 4,
            DType::F64 => 8,
            DType::I64 => 8,
        }
    }

    /// Whether this dtype is a floating-point type.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I64 => "i64",
        };
        write!(f, "{}", s)
    }
}

// WithDType - Trait that connects Rust types to the DType enum
//
// Kernels are written once, generic over T: WithDType, and instantiated per
// dtype through `with_dtype!`. The trait also knows how to find its own
// variant inside a `Storage` and a `Scalar`.

/// Trait implemented by Rust types that can be stored in a tensor.
pub trait WithDType:
    Copy
    + Send
    + Sync
    + 'static
    + PartialOrd
    + num_traits::Num
    + fmt::Debug
    + fmt::Display
{
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Convert this value to f64 (for generic numeric code).
    fn to_f64(self) -> f64;

    /// Create a value of this type from f64.
    fn from_f64(v: f64) -> Self;

    // Checked arithmetic: `None` when the exact result is not representable.
    // Float types follow IEEE semantics and never fail.

    fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(self + rhs)
    }

    fn checked_sub(self, rhs: Self) -> Option<Self> {
        Some(self - rhs)
    }

    fn checked_mul(self, rhs: Self) -> Option<Self> {
        Some(self * rhs)
    }

    fn checked_div(self, rhs: Self) -> Option<Self> {
        Some(self / rhs)
    }

    /// `self` raised to `exp`.
    fn checked_pow(self, exp: Self) -> Option<Self>;

    /// Borrow the typed buffer if `storage` holds this type.
    fn slice(storage: &Storage) -> Option<&[Self]>;

    /// Mutably borrow the typed buffer if `storage` holds this type.
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;

    /// Wrap a typed buffer into storage.
    fn into_storage(data: Vec<Self>) -> Storage;

    fn into_scalar(self) -> Scalar;

    /// Extract the value if `scalar` holds this type. No conversion is done.
    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

impl WithDType for f16 {
    const DTYPE: DType = DType::F16;
    fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
    fn checked_pow(self, exp: Self) -> Option<Self> {
        Some(f16::from_f32(self.to_f32().powf(exp.to_f32())))
    }
    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F16(v) => Some(v),
            _ => None,
        }
    }
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::F16(v) => Some(v),
            _ => None,
        }
    }
    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F16(data)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::F16(self)
    }
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::F16(v) => Some(v),
            _ => None,
        }
    }
}

impl WithDType for f32 {
    const DTYPE: DType = DType::F32;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    fn checked_pow(self, exp: Self) -> Option<Self> {
        Some(self.powf(exp))
    }
    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F32(v) => Some(v),
            _ => None,
        }
    }
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::F32(v) => Some(v),
            _ => None,
        }
    }
    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F32(data)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::F32(self)
    }
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::F32(v) => Some(v),
            _ => None,
        }
    }
}

impl WithDType for f64 {
    const DTYPE: DType = DType::F64;
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
    fn checked_pow(self, exp: Self) -> Option<Self> {
        Some(self.powf(exp))
    }
    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::F64(v) => Some(v),
            _ => None,
        }
    }
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::F64(v) => Some(v),
            _ => None,
        }
    }
    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::F64(data)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::F64(self)
    }
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::F64(v) => Some(v),
            _ => None,
        }
    }
}

impl WithDType for i64 {
    const DTYPE: DType = DType::I64;
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(v: f64) -> Self {
        v as i64
    }
    fn checked_add(self, rhs: Self) -> Option<Self> {
        i64::checked_add(self, rhs)
    }
    fn checked_sub(self, rhs: Self) -> Option<Self> {
        i64::checked_sub(self, rhs)
    }
    fn checked_mul(self, rhs: Self) -> Option<Self> {
        i64::checked_mul(self, rhs)
    }
    fn checked_div(self, rhs: Self) -> Option<Self> {
        i64::checked_div(self, rhs)
    }
    /// Exact integer power; negative exponents have no integer result.
    fn checked_pow(self, exp: Self) -> Option<Self> {
        u32::try_from(exp)
            .ok()
            .and_then(|e| i64::checked_pow(self, e))
    }
    fn slice(storage: &Storage) -> Option<&[Self]> {
        match storage {
            Storage::I64(v) => Some(v),
            _ => None,
        }
    }
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
        match storage {
            Storage::I64(v) => Some(v),
            _ => None,
        }
    }
    fn into_storage(data: Vec<Self>) -> Storage {
        Storage::I64(data)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::I64(self)
    }
    fn from_scalar(scalar: Scalar) -> Option<Self> {
        match scalar {
            Scalar::I64(v) => Some(v),
            _ => None,
        }
    }
}

/// Run `$body` with `$T` bound to the Rust element type of `$dtype`.
///
/// ```ignore
/// let n = with_dtype!(t.dtype(), T => t.to_vec::<T>()?.len());
/// ```
#[macro_export]
macro_rules! with_dtype {
    ($dtype:expr, $T:ident => $body:expr) => {
        match $dtype {
            $crate::DType::F16 => {
                type $T = $crate::f16;
                $body
            }
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::DType::I64 => {
                type $T = i64;
                $body
            }
        }
    };
}
