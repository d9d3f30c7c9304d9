use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dtype::{DType, WithDType};
use crate::engine::{Engine, HostEngine};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::scalar::Scalar;
use crate::shape::Shape;
use crate::storage::Storage;

// Tensor - typed, shaped buffer bound to an engine
//
// MEMORY MODEL:
//
//   The handle wraps an Arc, so cloning a Tensor is O(1). The element buffer
//   sits behind Arc<RwLock<Storage>>:
//   - views (transpose, reshape) and engine rebinding share the buffer
//   - in-place operations take the write lock and mutate that buffer, so
//     every handle sharing it observes the new values
//
//   Kernels must copy their inputs out (`to_vec`) and drop the read guards
//   before writing, otherwise `a += a` would deadlock on its own lock.
//
// ENGINE:
//
//   The engine decides which kernels run arithmetic on this tensor. New
//   tensors start on `HostEngine`, which supports no arithmetic; engines
//   such as vole-cpu's `CpuEngine` are attached with `with_engine`.

struct TensorInner {
    storage: Arc<RwLock<Storage>>,
    layout: Layout,
    dtype: DType,
    engine: Arc<dyn Engine>,
}

/// An n-dimensional array of numbers.
///
/// # Example
/// ```ignore
/// use vole_core::{arith, FuncOpts, Tensor};
///
/// let a = Tensor::from_vec(vec![1.0f64, 2.0, 3.0], 3)?.with_engine(cpu);
/// let b = arith::sub(5.0, &a, &FuncOpts::new())?; // [4, 3, 2]
/// ```
pub struct Tensor {
    inner: Arc<TensorInner>,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Tensor {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tensor(shape={}, dtype={}, engine={})",
            self.inner.layout.shape(),
            self.inner.dtype,
            self.inner.engine.name(),
        )
    }
}

impl Tensor {
    // Construction

    /// Allocate a tensor of `dtype` and `shape`, optionally over an existing
    /// backing buffer. Without a backing buffer the tensor is zero-filled.
    ///
    /// The backing buffer must hold exactly `shape.elem_count()` elements of
    /// `dtype`.
    pub fn new(dtype: DType, shape: impl Into<Shape>, backing: Option<Storage>) -> Result<Self> {
        let shape = shape.into();
        let storage = match backing {
            Some(s) => {
                if s.dtype() != dtype {
                    return Err(Error::DTypeMismatch {
                        expected: dtype,
                        got: s.dtype(),
                    });
                }
                s
            }
            None => Storage::zeros(dtype, shape.elem_count()),
        };
        Self::from_storage(storage, shape, HostEngine::shared())
    }

    /// Wrap `storage` as a contiguous tensor of `shape` bound to `engine`.
    pub fn from_storage(
        storage: Storage,
        shape: impl Into<Shape>,
        engine: Arc<dyn Engine>,
    ) -> Result<Self> {
        let shape = shape.into();
        if storage.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: storage.len(),
                shape,
            });
        }
        Ok(Tensor {
            inner: Arc::new(TensorInner {
                dtype: storage.dtype(),
                storage: Arc::new(RwLock::new(storage)),
                layout: Layout::contiguous(shape),
                engine,
            }),
        })
    }

    /// Create a tensor from an owned vector.
    pub fn from_vec<T: WithDType>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        Self::new(T::DTYPE, shape, Some(T::into_storage(data)))
    }

    /// Create a tensor by copying a slice.
    pub fn from_slice<T: WithDType>(data: &[T], shape: impl Into<Shape>) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// A zero-filled tensor.
    pub fn zeros(shape: impl Into<Shape>, dtype: DType) -> Result<Self> {
        Self::new(dtype, shape, None)
    }

    /// A rank-0 tensor holding one value.
    pub fn scalar<T: WithDType>(value: T) -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                dtype: T::DTYPE,
                storage: Arc::new(RwLock::new(T::into_storage(vec![value]))),
                layout: Layout::contiguous(Shape::from(())),
                engine: HostEngine::shared(),
            }),
        }
    }

    /// A handle to the same storage and layout, bound to `engine`.
    pub fn with_engine(&self, engine: Arc<dyn Engine>) -> Self {
        self.view(self.inner.layout.clone(), engine)
    }

    fn view(&self, layout: Layout, engine: Arc<dyn Engine>) -> Self {
        Tensor {
            inner: Arc::new(TensorInner {
                storage: Arc::clone(&self.inner.storage),
                layout,
                dtype: self.inner.dtype,
                engine,
            }),
        }
    }

    // Accessors

    pub fn shape(&self) -> &Shape {
        self.inner.layout.shape()
    }

    pub fn dims(&self) -> &[usize] {
        self.inner.layout.dims()
    }

    pub fn rank(&self) -> usize {
        self.inner.layout.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.inner.layout.elem_count()
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }

    pub fn is_contiguous(&self) -> bool {
        self.inner.layout.is_contiguous()
    }

    /// The engine that runs arithmetic on this tensor.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }

    /// Whether both handles point at the same backing buffer.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.inner.storage, &other.inner.storage)
    }

    /// Acquire a read lock on the backing buffer.
    ///
    /// The buffer may be larger than this tensor's view; index it through
    /// [`Tensor::layout`].
    pub fn read_storage(&self) -> Result<RwLockReadGuard<'_, Storage>> {
        self.inner
            .storage
            .read()
            .map_err(|_| Error::msg("storage lock poisoned"))
    }

    fn write_storage(&self) -> Result<RwLockWriteGuard<'_, Storage>> {
        self.inner
            .storage
            .write()
            .map_err(|_| Error::msg("storage lock poisoned"))
    }

    // Data access

    /// Copy the elements out in logical (row-major) order.
    pub fn to_vec<T: WithDType>(&self) -> Result<Vec<T>> {
        self.read_storage()?.gather::<T>(&self.inner.layout)
    }

    /// Copy the elements out as f64, whatever the dtype.
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        crate::with_dtype!(self.dtype(), T => {
            Ok(self.to_vec::<T>()?.into_iter().map(WithDType::to_f64).collect())
        })
    }

    /// Copy the elements out into a fresh contiguous `Storage`.
    pub fn to_storage(&self) -> Result<Storage> {
        crate::with_dtype!(self.dtype(), T => Ok(T::into_storage(self.to_vec::<T>()?)))
    }

    /// The single element of a one-element tensor.
    pub fn to_scalar(&self) -> Result<Scalar> {
        if self.elem_count() != 1 {
            return Err(Error::NotAScalar {
                shape: self.shape().clone(),
            });
        }
        crate::with_dtype!(self.dtype(), T => Ok(self.to_vec::<T>()?[0].into_scalar()))
    }

    // Views

    /// Swap two dimensions without copying.
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Self> {
        let layout = self.inner.layout.transpose(dim0, dim1)?;
        Ok(self.view(layout, self.inner.engine.clone()))
    }

    /// Matrix transpose of a rank-2 tensor.
    pub fn t(&self) -> Result<Self> {
        if self.rank() != 2 {
            return Err(Error::RankMismatch {
                expected: 2,
                got: self.rank(),
            });
        }
        self.transpose(0, 1)
    }

    /// Reinterpret with a new shape; copies first if the tensor is a
    /// non-contiguous view.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if self.is_contiguous() {
            let layout = self.inner.layout.reshape(shape)?;
            return Ok(self.view(layout, self.inner.engine.clone()));
        }
        let compact = self.contiguous()?;
        let layout = compact.inner.layout.reshape(shape)?;
        Ok(compact.view(layout, compact.inner.engine.clone()))
    }

    /// A contiguous tensor with the same values; `self` if already contiguous.
    pub fn contiguous(&self) -> Result<Self> {
        if self.is_contiguous() {
            return Ok(self.clone());
        }
        Self::from_storage(
            self.to_storage()?,
            self.shape().clone(),
            self.inner.engine.clone(),
        )
    }

    // In-place mutation

    /// Overwrite this tensor's elements with `src` (logical order).
    ///
    /// Every handle sharing the buffer observes the change.
    pub fn overwrite(&self, src: &Storage) -> Result<()> {
        self.check_write(src)?;
        let mut guard = self.write_storage()?;
        if self.is_contiguous() && guard.len() == src.len() {
            *guard = src.clone();
            return Ok(());
        }
        guard.scatter(&self.inner.layout, src)
    }

    /// Add `src` (logical order) onto this tensor's elements in place.
    pub fn accumulate(&self, src: &Storage) -> Result<()> {
        self.check_write(src)?;
        let mut guard = self.write_storage()?;
        guard.scatter_add(&self.inner.layout, src)
    }

    fn check_write(&self, src: &Storage) -> Result<()> {
        if src.dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: src.dtype(),
            });
        }
        if src.len() != self.elem_count() {
            return Err(Error::ElementCountMismatch {
                shape: self.shape().clone(),
                expected: self.elem_count(),
                got: src.len(),
            });
        }
        Ok(())
    }
}
