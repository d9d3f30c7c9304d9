// im2col / col2im - convolution lowered to matrix multiplication
//
// im2col extracts every sliding-window patch of a batched image and lays the
// patches out as rows of a matrix, so a convolution becomes one GEMM:
//
//   input   [N, C, H, W]
//   columns [N, H_out, W_out, C * kH * kW]      = im2col(input)
//   output  [N * H_out * W_out, C_out]          = columns @ weightᵀ
//
// with the usual size formula
//
//   H_out = (H + 2*pad_h - kernel_h) / stride_h + 1
//   W_out = (W + 2*pad_w - kernel_w) / stride_w + 1
//
// The division must be exact. A stride that does not tile the padded extent
// would silently drop the trailing rows/columns, so it is rejected as an
// invalid configuration.
//
// INDEXING:
//
//   Patch index ch in [0, C*kH*kW) decomposes into
//     image channel = ch / (kH*kW)
//     kernel row    = (ch / kW) % kH
//     kernel col    = ch % kW
//   and output position (oh, ow) reads source pixel
//     (oh*stride_h - pad_h + kernel row, ow*stride_w - pad_w + kernel col)
//   which is zero when it falls outside the image. Padding is never
//   materialized.
//
// col2im is the adjoint: the same index walk, but adding each column value
// into its source pixel of a zeroed image. Patches overlap whenever
// stride < kernel, so several column entries land on one pixel and their
// contributions must sum. Both transforms parallelize over the batch only:
// samples own disjoint slices of the output, so concurrent writers never
// touch the same element.

use std::fmt;

use rayon::prelude::*;

use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::storage::Storage;
use crate::tensor::Tensor;

/// Minimum number of output elements before batches are processed in parallel.
const PAR_THRESHOLD: usize = 1 << 15;

/// Kernel size, zero padding and stride of a patch transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchParams {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl PatchParams {
    /// `kernel`: `[kH, kW]`, `padding`: `[pH, pW]`, `stride`: `[sH, sW]`.
    pub fn new(kernel: [usize; 2], padding: [usize; 2], stride: [usize; 2]) -> Self {
        let [kernel_h, kernel_w] = kernel;
        let [pad_h, pad_w] = padding;
        let [stride_h, stride_w] = stride;
        PatchParams {
            kernel_h,
            kernel_w,
            pad_h,
            pad_w,
            stride_h,
            stride_w,
        }
    }

    /// Number of values in one patch: `channels * kH * kW`.
    pub fn patch_len(&self, channels: usize) -> usize {
        channels * self.kernel_h * self.kernel_w
    }

    /// `(H_out, W_out)` for an `height x width` image.
    pub fn output_hw(&self, height: usize, width: usize) -> Result<(usize, usize)> {
        Ok((
            output_dim(height, self.kernel_h, self.pad_h, self.stride_h)?,
            output_dim(width, self.kernel_w, self.pad_w, self.stride_w)?,
        ))
    }
}

/// Output extent along one axis: `(input + 2*pad - kernel) / stride + 1`.
///
/// Fails unless kernel and stride are positive, the kernel fits the padded
/// input and the stride divides the remaining extent exactly.
pub fn output_dim(input: usize, kernel: usize, pad: usize, stride: usize) -> Result<usize> {
    if kernel == 0 || stride == 0 {
        return Err(Error::config(format!(
            "kernel ({kernel}) and stride ({stride}) must be positive"
        )));
    }
    let padded = pad
        .checked_mul(2)
        .and_then(|p| input.checked_add(p))
        .ok_or_else(|| Error::config(format!("padding {pad} overflows extent {input}")))?;
    if padded < kernel {
        return Err(Error::config(format!(
            "kernel {kernel} larger than padded extent {padded}"
        )));
    }
    let span = padded - kernel;
    if span % stride != 0 {
        return Err(Error::config(format!(
            "stride {stride} does not evenly tile extent {padded} with kernel {kernel}: \
             ({padded} - {kernel}) / {stride} + 1 is not an integer"
        )));
    }
    Ok(span / stride + 1)
}

/// Split a patch index into `(image channel, kernel row, kernel col)`.
pub fn decompose_patch_index(ch: usize, kernel_h: usize, kernel_w: usize) -> (usize, usize, usize) {
    (ch / (kernel_h * kernel_w), (ch / kernel_w) % kernel_h, ch % kernel_w)
}

/// Source coordinate `out*stride - pad + offset`, if inside `[0, extent)`.
pub fn source_coord(
    out: usize,
    stride: usize,
    pad: usize,
    offset: usize,
    extent: usize,
) -> Option<usize> {
    (out * stride + offset)
        .checked_sub(pad)
        .filter(|&c| c < extent)
}

/// Per-call dimensions derived from the params and the image shape.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
    out_h: usize,
    out_w: usize,
    patch: usize,
}

impl Geometry {
    fn new(params: &PatchParams, image: &Shape) -> Result<Self> {
        let [batch, channels, height, width] = match image.dims() {
            &[n, c, h, w] => [n, c, h, w],
            _ => {
                return Err(Error::RankMismatch {
                    expected: 4,
                    got: image.rank(),
                })
            }
        };
        let (out_h, out_w) = params.output_hw(height, width)?;
        Ok(Geometry {
            batch,
            channels,
            height,
            width,
            out_h,
            out_w,
            patch: params.patch_len(channels),
        })
    }

    fn image_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    fn columns_len(&self) -> usize {
        self.out_h * self.out_w * self.patch
    }

    fn columns_shape(&self) -> Shape {
        Shape::from((self.batch, self.out_h, self.out_w, self.patch))
    }

    /// Visit `(column index, image index)` of every in-bounds entry of one
    /// sample. Out-of-bounds entries are passed with `None`.
    fn walk(&self, p: &PatchParams, mut f: impl FnMut(usize, Option<usize>)) {
        for oh in 0..self.out_h {
            for ow in 0..self.out_w {
                let row = (oh * self.out_w + ow) * self.patch;
                for ch in 0..self.patch {
                    let (ic, kr, kc) = decompose_patch_index(ch, p.kernel_h, p.kernel_w);
                    let src_r = source_coord(oh, p.stride_h, p.pad_h, kr, self.height);
                    let src_c = source_coord(ow, p.stride_w, p.pad_w, kc, self.width);
                    let src = match (src_r, src_c) {
                        (Some(r), Some(c)) => Some((ic * self.height + r) * self.width + c),
                        _ => None,
                    };
                    f(row + ch, src);
                }
            }
        }
    }
}

fn im2col_sample<T: WithDType>(p: &PatchParams, g: &Geometry, image: &[T], col: &mut [T]) {
    g.walk(p, |ci, src| {
        col[ci] = match src {
            Some(ii) => image[ii],
            None => T::zero(),
        };
    });
}

fn col2im_sample<T: WithDType>(p: &PatchParams, g: &Geometry, col: &[T], image: &mut [T]) {
    g.walk(p, |ci, src| {
        if let Some(ii) = src {
            image[ii] = image[ii] + col[ci];
        }
    });
}

/// Run `kernel` over every sample: `dst` is split into `dst_chunk` slices and
/// `src` into `src_chunk` slices, one pair per sample.
fn per_sample<T: WithDType>(
    src: &[T],
    src_chunk: usize,
    dst: &mut [T],
    dst_chunk: usize,
    batch: usize,
    kernel: impl Fn(&[T], &mut [T]) + Send + Sync,
) {
    if src_chunk == 0 || dst_chunk == 0 {
        return;
    }
    if batch > 1 && dst.len() >= PAR_THRESHOLD {
        dst.par_chunks_mut(dst_chunk)
            .zip(src.par_chunks(src_chunk))
            .for_each(|(d, s)| kernel(s, d));
    } else {
        dst.chunks_mut(dst_chunk)
            .zip(src.chunks(src_chunk))
            .for_each(|(d, s)| kernel(s, d));
    }
}

/// The im2col transform.
///
/// ```ignore
/// let cols = Im2Col::new(PatchParams::new([3, 3], [1, 1], [1, 1])).apply(&images)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Im2Col {
    params: PatchParams,
}

impl Im2Col {
    pub fn new(params: PatchParams) -> Self {
        Im2Col { params }
    }

    pub fn params(&self) -> &PatchParams {
        &self.params
    }

    /// The col2im transform with the same parameters.
    pub fn adjoint(&self) -> Col2Im {
        Col2Im::new(self.params)
    }

    /// Column shape `[N, H_out, W_out, C*kH*kW]` for an `[N, C, H, W]` input.
    pub fn infer_shape(&self, input: &Shape) -> Result<Shape> {
        Ok(Geometry::new(&self.params, input)?.columns_shape())
    }

    /// Extract the patches of a 4-D F32 or F64 tensor.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        let g = Geometry::new(&self.params, input.shape())?;
        tracing::debug!(
            op = %self,
            input = %input.shape(),
            out_h = g.out_h,
            out_w = g.out_w,
            "im2col"
        );
        let storage = match input.dtype() {
            DType::F32 => Storage::F32(self.run::<f32>(&g, input)?),
            DType::F64 => Storage::F64(self.run::<f64>(&g, input)?),
            dtype => return Err(Error::UnsupportedDType { op: "im2col", dtype }),
        };
        Tensor::from_storage(storage, g.columns_shape(), input.engine().clone())
    }

    fn run<T: WithDType>(&self, g: &Geometry, input: &Tensor) -> Result<Vec<T>> {
        let image = input.to_vec::<T>()?;
        let mut col = vec![T::zero(); g.batch * g.columns_len()];
        let p = self.params;
        let geom = *g;
        per_sample(
            &image,
            g.image_len(),
            &mut col,
            g.columns_len(),
            g.batch,
            move |im, c| im2col_sample(&p, &geom, im, c),
        );
        Ok(col)
    }
}

impl fmt::Display for Im2Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        write!(
            f,
            "im2col<({},{}), ({},{}), ({},{})>",
            p.kernel_h, p.kernel_w, p.pad_h, p.pad_w, p.stride_h, p.stride_w
        )
    }
}

/// The col2im transform: adjoint of [`Im2Col`], used to carry column-space
/// gradients back to image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Col2Im {
    params: PatchParams,
}

impl Col2Im {
    pub fn new(params: PatchParams) -> Self {
        Col2Im { params }
    }

    pub fn params(&self) -> &PatchParams {
        &self.params
    }

    /// Accumulate `col` into a zeroed image of `output_shape` `[N, C, H, W]`.
    ///
    /// `col` may have any shape as long as it holds
    /// `N * H_out * W_out * C * kH * kW` elements in the im2col order.
    pub fn apply(&self, col: &Tensor, output_shape: impl Into<Shape>) -> Result<Tensor> {
        let output_shape = output_shape.into();
        let g = Geometry::new(&self.params, &output_shape)?;
        let expected = g.columns_shape();
        if col.elem_count() != expected.elem_count() {
            return Err(Error::ShapeMismatch {
                expected,
                got: col.shape().clone(),
            });
        }
        tracing::debug!(
            op = %self,
            col = %col.shape(),
            output = %output_shape,
            "col2im"
        );
        let storage = match col.dtype() {
            DType::F32 => Storage::F32(self.run::<f32>(&g, col)?),
            DType::F64 => Storage::F64(self.run::<f64>(&g, col)?),
            dtype => return Err(Error::UnsupportedDType { op: "col2im", dtype }),
        };
        Tensor::from_storage(storage, output_shape, col.engine().clone())
    }

    fn run<T: WithDType>(&self, g: &Geometry, col: &Tensor) -> Result<Vec<T>> {
        let columns = col.to_vec::<T>()?;
        let mut image = vec![T::zero(); g.batch * g.image_len()];
        let p = self.params;
        let geom = *g;
        per_sample(
            &columns,
            g.columns_len(),
            &mut image,
            g.image_len(),
            g.batch,
            move |c, im| col2im_sample(&p, &geom, c, im),
        );
        Ok(image)
    }
}

impl fmt::Display for Col2Im {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        write!(
            f,
            "col2im<({},{}), ({},{}), ({},{})>",
            p.kernel_h, p.kernel_w, p.pad_h, p.pad_w, p.stride_h, p.stride_w
        )
    }
}

/// `Im2Col::new(params).apply(input)`.
pub fn im2col(params: PatchParams, input: &Tensor) -> Result<Tensor> {
    Im2Col::new(params).apply(input)
}

/// `Col2Im::new(params).apply(col, output_shape)`.
pub fn col2im(params: PatchParams, col: &Tensor, output_shape: impl Into<Shape>) -> Result<Tensor> {
    Col2Im::new(params).apply(col, output_shape)
}
