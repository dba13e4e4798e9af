//! Resample image filter.
//!
//! Resamples a moving 2D image onto a fixed reference grid using a
//! transform and an interpolator.

use crate::image::{grid, Image};
use crate::interpolation::trait_::Interpolator;
use crate::spatial::{Direction2, Point2, Spacing2};
use crate::transform::trait_::Transform;
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use std::marker::PhantomData;

/// Resample image filter.
///
/// The output geometry (size, origin, spacing, direction) defines the fixed
/// reference grid. For each output pixel, the transform maps its physical
/// location into the input image space, where the interpolator samples the
/// moving image. The transform therefore maps output physical space to
/// input physical space.
///
/// # Type Parameters
/// * `B` - The backend
/// * `T` - The transform type
/// * `I` - The interpolator type
pub struct ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 2>,
    I: Interpolator<B>,
{
    size: [usize; 2],
    origin: Point2,
    spacing: Spacing2,
    direction: Direction2,
    transform: T,
    interpolator: I,
    _phantom: PhantomData<B>,
}

impl<B, T, I> ResampleImageFilter<B, T, I>
where
    B: Backend,
    T: Transform<B, 2>,
    I: Interpolator<B>,
{
    /// Create a new resample filter with an explicit output grid.
    pub fn new(
        size: [usize; 2],
        origin: Point2,
        spacing: Spacing2,
        direction: Direction2,
        transform: T,
        interpolator: I,
    ) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
            transform,
            interpolator,
            _phantom: PhantomData,
        }
    }

    /// Create a filter whose output grid copies a reference image.
    pub fn new_from_reference(reference: &Image<B, 2>, transform: T, interpolator: I) -> Self {
        Self::new(
            reference.shape(),
            *reference.origin(),
            *reference.spacing(),
            *reference.direction(),
            transform,
            interpolator,
        )
    }

    /// Resample an input image onto the output grid.
    pub fn apply(&self, input: &Image<B, 2>) -> Image<B, 2> {
        let device = input.data().device();

        // 1. Indices of the output grid
        let output_indices = grid::generate_grid_2d::<B>(self.size, &device);

        // 2. Output indices -> output physical points
        let output_points = self.indices_to_physical(output_indices, &device);

        // 3. Transform into input physical space
        let input_points = self.transform.transform_points(output_points);

        // 4. Input physical points -> input continuous indices
        let input_indices = input.world_to_index_tensor(input_points);

        // 5. Interpolate and reshape to the output size
        let output_flat = self.interpolator.interpolate(input.data(), input_indices);
        let output_data = output_flat.reshape(Shape::new(self.size));

        Image::new(output_data, self.origin, self.spacing, self.direction)
    }

    fn indices_to_physical(
        &self,
        indices: Tensor<B, 2>,
        device: &<B as Backend>::Device,
    ) -> Tensor<B, 2> {
        // point = origin + Direction * (index * spacing)
        let origin_vec: Vec<f64> = (0..2).map(|i| self.origin[i]).collect();
        let origin_tensor =
            Tensor::<B, 1>::from_data(TensorData::new(origin_vec, Shape::new([2])), device)
                .reshape([1, 2]);

        let spacing_vec: Vec<f64> = (0..2).map(|i| self.spacing[i]).collect();
        let spacing_tensor =
            Tensor::<B, 1>::from_data(TensorData::new(spacing_vec, Shape::new([2])), device)
                .reshape([1, 2]);

        let scaled_indices = indices * spacing_tensor;

        // Direction transposed for row-vector matmul
        let mut dir_data = Vec::with_capacity(4);
        for c in 0..2 {
            for r in 0..2 {
                dir_data.push(self.direction[(r, c)]);
            }
        }
        let dir_t_tensor =
            Tensor::<B, 1>::from_data(TensorData::new(dir_data, Shape::new([4])), device)
                .reshape([2, 2]);

        let rotated = scaled_indices.matmul(dir_t_tensor);
        origin_tensor + rotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::LinearInterpolator;
    use crate::spatial::Vector2;
    use crate::transform::Euler2D;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn square_image(device: &<TestBackend as Backend>::Device) -> Image<TestBackend, 2> {
        // 10x10 image with a 2x2 square at (4,4)..(5,5)
        let mut data = vec![0.0; 100];
        data[4 * 10 + 4] = 1.0;
        data[4 * 10 + 5] = 1.0;
        data[5 * 10 + 4] = 1.0;
        data[5 * 10 + 5] = 1.0;

        let tensor = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(data, Shape::new([10, 10])),
            device,
        );
        Image::new(
            tensor,
            Point2::origin(),
            Spacing2::uniform(1.0),
            Direction2::identity(),
        )
    }

    #[test]
    fn test_resample_identity_reproduces_input() {
        let device = Default::default();
        let image = square_image(&device);

        let filter = ResampleImageFilter::new_from_reference(
            &image,
            Euler2D::identity(),
            LinearInterpolator::new(),
        );
        let result = filter.apply(&image);

        let expected = image.data().clone().into_data();
        let actual = result.data().clone().into_data();
        assert_eq!(
            expected.as_slice::<f32>().unwrap(),
            actual.as_slice::<f32>().unwrap()
        );
    }

    #[test]
    fn test_resample_translation_moves_content() {
        let device = Default::default();
        let image = square_image(&device);

        // The transform maps output space to input space, so a transform
        // translating by (-2, -1) shifts image content by (+2, +1).
        let transform = Euler2D::new(0.0, Vector2::new([-2.0, -1.0]), Point2::origin());
        let filter =
            ResampleImageFilter::new_from_reference(&image, transform, LinearInterpolator::new());
        let result = filter.apply(&image);

        let data = result.data().clone().into_data();
        let slice = data.as_slice::<f32>().unwrap();

        assert!(slice[5 * 10 + 6] > 0.9);
        assert!(slice[5 * 10 + 7] > 0.9);
        assert!(slice[6 * 10 + 6] > 0.9);
        assert!(slice[6 * 10 + 7] > 0.9);
        assert!(slice[4 * 10 + 4] < 0.1);
    }
}
