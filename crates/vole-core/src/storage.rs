use half::f16;

use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::layout::Layout;

// Storage - the flat typed buffer behind a tensor
//
// One variant per DType. Kernels never match on the variants directly: they
// pick T with `with_dtype!` and then borrow the buffer through
// `WithDType::slice`, so a dtype confusion surfaces as `DTypeMismatch`
// instead of a panic.

/// Contiguous host buffer holding a tensor's elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    F16(Vec<f16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl Storage {
    /// A zero-filled buffer of `len` elements.
    pub fn zeros(dtype: DType, len: usize) -> Self {
        crate::with_dtype!(dtype, T => T::into_storage(vec![<T as num_traits::Zero>::zero(); len]))
    }

    pub fn dtype(&self) -> DType {
        match self {
            Storage::F16(_) => DType::F16,
            Storage::F32(_) => DType::F32,
            Storage::F64(_) => DType::F64,
            Storage::I64(_) => DType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Storage::F16(v) => v.len(),
            Storage::F32(v) => v.len(),
            Storage::F64(v) => v.len(),
            Storage::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the buffer as `&[T]`, failing if the dtype differs.
    pub fn typed<T: WithDType>(&self) -> Result<&[T]> {
        T::slice(self).ok_or(Error::DTypeMismatch {
            expected: T::DTYPE,
            got: self.dtype(),
        })
    }

    /// Borrow the buffer as `&mut [T]`, failing if the dtype differs.
    pub fn typed_mut<T: WithDType>(&mut self) -> Result<&mut [T]> {
        let got = self.dtype();
        T::slice_mut(self).ok_or(Error::DTypeMismatch {
            expected: T::DTYPE,
            got,
        })
    }

    /// Copy out the elements addressed by `layout`, in logical order.
    pub fn gather<T: WithDType>(&self, layout: &Layout) -> Result<Vec<T>> {
        let data = self.typed::<T>()?;
        if layout.is_contiguous() {
            return Ok(data[..layout.elem_count()].to_vec());
        }
        Ok(layout.strided_indices().map(|i| data[i]).collect())
    }

    /// Write `src` (logical order) into the positions addressed by `layout`.
    pub fn scatter(&mut self, layout: &Layout, src: &Storage) -> Result<()> {
        crate::with_dtype!(src.dtype(), T => {
            let values = src.typed::<T>()?;
            let dst = self.typed_mut::<T>()?;
            for (i, &v) in layout.strided_indices().zip(values.iter()) {
                dst[i] = v;
            }
            Ok(())
        })
    }

    /// Add `src` (logical order) onto the positions addressed by `layout`.
    pub fn scatter_add(&mut self, layout: &Layout, src: &Storage) -> Result<()> {
        crate::with_dtype!(src.dtype(), T => {
            let values = src.typed::<T>()?;
            let dst = self.typed_mut::<T>()?;
            // all sums are computed before any write, so an overflow leaves
            // the buffer untouched
            let sums = layout
                .strided_indices()
                .zip(values.iter())
                .map(|(i, &v)| add_checked(dst[i], v).map(|sum| (i, sum)))
                .collect::<Result<Vec<_>>>()?;
            for (i, sum) in sums {
                dst[i] = sum;
            }
            Ok(())
        })
    }
}

fn add_checked<T: WithDType>(a: T, b: T) -> Result<T> {
    a.checked_add(b)
        .ok_or(Error::IntegerOverflow { op: "accumulate" })
}
