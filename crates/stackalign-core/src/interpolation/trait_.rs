//! Interpolator trait.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Interpolator for sampling 2D image data at continuous indices.
///
/// Implementations must be deterministic: identical data and indices
/// produce identical outputs.
pub trait Interpolator<B: Backend> {
    /// Sample `data` at a batch of continuous indices.
    ///
    /// # Arguments
    /// * `data` - Image data of shape `[H, W]`
    /// * `indices` - Tensor of shape `[N, 2]` with `(x, y)` index coordinates
    ///
    /// # Returns
    /// Tensor of shape `[N]` with interpolated values
    fn interpolate(&self, data: &Tensor<B, 2>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
