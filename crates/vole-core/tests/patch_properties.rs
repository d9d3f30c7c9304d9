//! Property-based tests for the im2col / col2im pair.
//!
//! Inputs are small integers stored as f64 so every sum is exact and the
//! identities can be checked with equality.

use proptest::prelude::*;
use vole_core::{col2im, im2col, Im2Col, PatchParams, Shape, Tensor};

/// A valid (params, [n, c, h, w]) pair: the image size is derived from the
/// output size so the stride always tiles the padded extent.
fn config() -> impl Strategy<Value = (PatchParams, [usize; 4])> {
    (
        1usize..=2,
        1usize..=3,
        (1usize..=3, 1usize..=3),
        0usize..=1,
        (1usize..=3, 1usize..=3),
        (1usize..=4, 1usize..=4),
    )
        .prop_filter_map(
            "image would be empty",
            |(n, c, (kh, kw), pad, (sh, sw), (oh, ow))| {
                let h = ((oh - 1) * sh + kh).checked_sub(2 * pad)?;
                let w = ((ow - 1) * sw + kw).checked_sub(2 * pad)?;
                if h == 0 || w == 0 {
                    return None;
                }
                Some((PatchParams::new([kh, kw], [pad, pad], [sh, sw]), [n, c, h, w]))
            },
        )
}

fn config_with_data() -> impl Strategy<Value = (PatchParams, [usize; 4], Vec<i32>, Vec<i32>)> {
    config().prop_flat_map(|(params, dims)| {
        let image_len: usize = dims.iter().product();
        let col_len = Im2Col::new(params)
            .infer_shape(&Shape::from(dims))
            .map(|s| s.elem_count())
            .unwrap_or(0);
        (
            Just(params),
            Just(dims),
            prop::collection::vec(-5i32..=5, image_len),
            prop::collection::vec(-5i32..=5, col_len),
        )
    })
}

fn tensor(data: &[i32], shape: impl Into<Shape>) -> Tensor {
    Tensor::from_vec(data.iter().map(|&v| v as f64).collect(), shape).unwrap()
}

fn inner(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

proptest! {
    /// <im2col(x), y> == <x, col2im(y)>
    #[test]
    fn prop_col2im_is_adjoint((params, dims, x, y) in config_with_data()) {
        let xt = tensor(&x, dims);
        let cols = im2col(params, &xt).unwrap();
        let yt = tensor(&y, cols.shape());
        let back = col2im(params, &yt, dims).unwrap();

        let lhs = inner(&cols.to_vec::<f64>().unwrap(), &yt.to_vec::<f64>().unwrap());
        let rhs = inner(&xt.to_vec::<f64>().unwrap(), &back.to_vec::<f64>().unwrap());
        prop_assert_eq!(lhs, rhs);
    }

    /// Column shape follows the output-size formula.
    #[test]
    fn prop_columns_shape((params, dims) in config()) {
        let [n, c, h, w] = dims;
        let cols = im2col(params, &Tensor::from_vec(vec![0.0f32; n * c * h * w], dims).unwrap()).unwrap();
        let oh = (h + 2 * params.pad_h - params.kernel_h) / params.stride_h + 1;
        let ow = (w + 2 * params.pad_w - params.kernel_w) / params.stride_w + 1;
        prop_assert_eq!(cols.dims(), &[n, oh, ow, c * params.kernel_h * params.kernel_w][..]);
    }

    /// Tiling patches (stride == kernel, no padding) reconstruct the image.
    #[test]
    fn prop_tiling_roundtrip(
        n in 1usize..=2,
        c in 1usize..=3,
        k in 1usize..=3,
        (th, tw) in (1usize..=4, 1usize..=4),
        seed in -5i32..=5,
    ) {
        let (h, w) = (th * k, tw * k);
        let data: Vec<i32> = (0..n * c * h * w)
            .map(|i| ((i as i32 * 7 + seed) % 11) - 5)
            .collect();
        let params = PatchParams::new([k, k], [0, 0], [k, k]);
        let x = tensor(&data, [n, c, h, w]);
        let back = col2im(params, &im2col(params, &x).unwrap(), [n, c, h, w]).unwrap();
        prop_assert_eq!(back.to_vec::<f64>().unwrap(), x.to_vec::<f64>().unwrap());
    }
}
