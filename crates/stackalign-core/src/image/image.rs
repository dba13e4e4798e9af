//! Image type with physical metadata and coordinate transformations.
//!
//! An image combines tensor data with the physical-space metadata (origin,
//! spacing, direction) that describes how pixel indices map to physical
//! coordinates.

use crate::spatial::{Direction, Point, Spacing, Vector};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

/// Image with physical metadata.
///
/// # Coordinate Systems
/// * **Index Space**: Discrete pixel/voxel indices (integer coordinates).
/// * **Physical Space**: Continuous coordinates in mm or other units.
///
/// Index coordinates are ordered `(x, y[, z])` while tensor data is stored
/// in row-major `[z,] y, x` layout.
///
/// # Type Parameters
/// * `B` - The backend for tensor operations
/// * `D` - The dimensionality of the image (2 or 3)
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// The pixel data.
    data: Tensor<B, D>,
    /// Physical coordinate of the first pixel (index 0, 0, ...).
    origin: Point<D>,
    /// Physical distance between pixels along each axis.
    spacing: Spacing<D>,
    /// Orientation of the image axes.
    direction: Direction<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image with the given data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Get the origin (physical coordinate of first pixel).
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Get the spacing (physical distance between pixels).
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Get the image shape as an array.
    pub fn shape(&self) -> [usize; D] {
        self.data.shape().dims.try_into().expect("Tensor rank mismatch")
    }

    /// Total number of pixels.
    pub fn num_pixels(&self) -> usize {
        self.shape().iter().product()
    }

    /// Convert a continuous physical point to a continuous index.
    ///
    /// `index = (Direction^-1 * (point - origin)) / spacing`
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        let diff = *point - self.origin;
        let inv_dir = self
            .direction
            .try_inverse()
            .expect("Direction matrix must be invertible");
        let rotated = inv_dir * diff;

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        index
    }

    /// Convert a continuous index to a physical point.
    ///
    /// `point = origin + Direction * (index * spacing)`
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled_index = Vector::<D>::zeros();
        for i in 0..D {
            scaled_index[i] = index[i] * self.spacing[i];
        }

        let rotated = self.direction * scaled_index;
        self.origin + rotated
    }

    /// Batch transform physical points to continuous indices.
    ///
    /// # Arguments
    /// * `points` - A tensor of shape `[Batch, D]` containing physical points
    ///
    /// # Returns
    /// A tensor of shape `[Batch, D]` containing continuous indices
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();

        // I = (P - O) @ T with T_rc = (Direction^-1)_cr / spacing_c
        let origin_vec: Vec<f64> = (0..D).map(|i| self.origin[i]).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(
            TensorData::new(origin_vec, Shape::new([D])),
            &device,
        )
        .reshape([1, D]);

        let inv_dir = self
            .direction
            .try_inverse()
            .expect("Direction matrix must be invertible");

        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push(inv_dir[(c, r)] / self.spacing[c]);
            }
        }

        let t_tensor =
            Tensor::<B, 1>::from_data(TensorData::new(t_data, Shape::new([D * D])), &device)
                .reshape([D, D]);

        let diff = points - origin_tensor;
        diff.matmul(t_tensor)
    }
}
