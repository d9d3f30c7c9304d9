use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::storage::Storage;
use crate::tensor::Tensor;

// FuncOpts - per-call options shared by every operation
//
// By default an operation allocates a fresh result tensor. Two options
// redirect the result into existing storage:
//
//   in_place  - overwrite the first tensor operand and return a handle that
//               aliases it ("unsafe" mode: the caller's data is destroyed)
//   reuse     - write into a caller-provided tensor; with `incr` the result
//               is added onto it instead
//
// Engines never decide on their own where a result goes: they compute a
// contiguous `Storage` and hand it to `FuncOpts::write_result`.

/// Options accepted by the arithmetic and linear-algebra operations.
#[derive(Debug, Clone, Default)]
pub struct FuncOpts {
    in_place: bool,
    reuse: Option<Tensor>,
    incr: bool,
}

impl FuncOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the first tensor operand with the result.
    ///
    /// The returned tensor aliases that operand's storage, and so does every
    /// other handle to it.
    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    /// Write the result into `tensor`, which must already have the result's
    /// shape and dtype.
    pub fn with_reuse(mut self, tensor: Tensor) -> Self {
        self.reuse = Some(tensor);
        self
    }

    /// Add the result onto the reuse tensor instead of overwriting it.
    pub fn incr(mut self) -> Self {
        self.incr = true;
        self
    }

    pub fn is_in_place(&self) -> bool {
        self.in_place
    }

    pub fn reuse(&self) -> Option<&Tensor> {
        self.reuse.as_ref()
    }

    pub fn is_incr(&self) -> bool {
        self.incr
    }

    /// Reject option combinations that cannot describe a single destination.
    pub fn validate(&self) -> Result<()> {
        if self.in_place && self.reuse.is_some() {
            return Err(Error::config("in_place and reuse are mutually exclusive"));
        }
        if self.incr && self.reuse.is_none() {
            return Err(Error::config("incr requires a reuse tensor"));
        }
        Ok(())
    }

    /// Deliver a computed result according to these options.
    ///
    /// `first` is the first tensor operand: it is the in-place destination and
    /// lends its engine to a freshly allocated result.
    pub fn write_result(&self, first: &Tensor, result: Storage, shape: Shape) -> Result<Tensor> {
        self.validate()?;
        if self.in_place {
            if first.shape() != &shape {
                return Err(Error::config(format!(
                    "cannot write a {} result in place over a {} operand",
                    shape,
                    first.shape()
                )));
            }
            if first.dtype() != result.dtype() {
                return Err(Error::config(format!(
                    "cannot write a {} result in place over a {} operand",
                    result.dtype(),
                    first.dtype()
                )));
            }
            tracing::trace!(shape = %shape, "writing result in place");
            first.overwrite(&result)?;
            return Ok(first.clone());
        }
        if let Some(reuse) = &self.reuse {
            if reuse.shape() != &shape {
                return Err(Error::ShapeMismatch {
                    expected: shape,
                    got: reuse.shape().clone(),
                });
            }
            if reuse.dtype() != result.dtype() {
                return Err(Error::DTypeMismatch {
                    expected: result.dtype(),
                    got: reuse.dtype(),
                });
            }
            if self.incr {
                reuse.accumulate(&result)?;
            } else {
                reuse.overwrite(&result)?;
            }
            return Ok(reuse.clone());
        }
        Tensor::from_storage(result, shape, first.engine().clone())
    }
}
