//! Bilinear interpolation.

use super::trait_::Interpolator;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// Linear (bilinear) interpolator for 2D data.
///
/// Indices outside the image are clamped to the border pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn gather_2d<B: Backend>(
        flat_data: &Tensor<B, 1>,
        xi: &Tensor<B, 1, Int>,
        yi: &Tensor<B, 1, Int>,
        stride_y: i32,
    ) -> Tensor<B, 1> {
        let idx = yi.clone() * stride_y + xi.clone();
        flat_data.clone().gather(0, idx)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 2>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1] = data.dims(); // [Y, X]
        let batch_size = indices.dims()[0];
        let device = indices.device();

        // indices: [N, 2] -> (x, y)
        let x = indices.clone().narrow(1, 0, 1).squeeze::<1>(1);
        let y = indices.narrow(1, 1, 1).squeeze::<1>(1);

        // Floor coordinates and interpolation weights
        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let wx = x - x0.clone();
        let wy = y - y0.clone();

        let x1 = x0.clone() + 1.0;
        let y1 = y0.clone() + 1.0;

        // Clamp indices to the valid region
        let x0_i = x0.clamp(0.0, (d1 - 1) as f64).int();
        let y0_i = y0.clamp(0.0, (d0 - 1) as f64).int();
        let x1_i = x1.clamp(0.0, (d1 - 1) as f64).int();
        let y1_i = y1.clamp(0.0, (d0 - 1) as f64).int();

        let stride_y = d1 as i32;
        let flat_data = data.clone().reshape([d0 * d1]);

        let v00 = Self::gather_2d(&flat_data, &x0_i, &y0_i, stride_y);
        let v01 = Self::gather_2d(&flat_data, &x0_i, &y1_i, stride_y);
        let v10 = Self::gather_2d(&flat_data, &x1_i, &y0_i, stride_y);
        let v11 = Self::gather_2d(&flat_data, &x1_i, &y1_i, stride_y);

        let one = Tensor::<B, 1>::ones([batch_size], &device);
        let one_minus_wx = one.clone() - wx.clone();
        let one_minus_wy = one - wy.clone();

        let c0 = v00 * one_minus_wx.clone() + v10 * wx.clone();
        let c1 = v01 * one_minus_wx + v11 * wx;

        c0 * one_minus_wy + c1 * wy
    }
}
