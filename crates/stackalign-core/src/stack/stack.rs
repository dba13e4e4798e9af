//! Ordered stack of slices.

use super::slice::Slice;
use super::StackError;
use crate::image::Image;
use crate::spatial::Point3;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Ordered sequence of slices cut from one 3D volume.
///
/// Insertion order is the slice index and is semantically meaningful: it is
/// the original order along the through-plane axis.
#[derive(Debug, Clone)]
pub struct Stack<B: Backend> {
    slices: Vec<Slice<B>>,
    filename: String,
}

impl<B: Backend> Stack<B> {
    /// Create a stack from pre-built slices.
    pub fn new(slices: Vec<Slice<B>>, filename: impl Into<String>) -> Result<Self, StackError> {
        if slices.is_empty() {
            return Err(StackError::EmptyStack);
        }
        Ok(Self {
            slices,
            filename: filename.into(),
        })
    }

    /// Structural copy of an existing stack, optionally renamed.
    pub fn from_stack(stack: &Stack<B>, filename: Option<String>) -> Self {
        Self {
            slices: stack.slices.clone(),
            filename: filename.unwrap_or_else(|| stack.filename.clone()),
        }
    }

    /// Split a 3D volume (and optional volume mask) into per-plane slices.
    ///
    /// Plane k along the through-plane axis becomes slice k; its origin is
    /// the physical location of index `(0, 0, k)` in the volume, while
    /// direction and spacing are inherited. The volume mask, when given,
    /// is distributed plane by plane.
    pub fn from_image(
        image: &Image<B, 3>,
        mask: Option<&Tensor<B, 3>>,
        filename: impl Into<String>,
    ) -> Result<Self, StackError> {
        let filename = filename.into();
        let shape = image.shape();
        let num_slices = shape[0];
        if num_slices == 0 {
            return Err(StackError::EmptyStack);
        }
        if let Some(mask) = mask {
            if mask.dims() != shape {
                return Err(StackError::MaskShapeMismatch {
                    slice: shape.to_vec(),
                    mask: mask.dims().to_vec(),
                });
            }
        }

        let mut slices = Vec::with_capacity(num_slices);
        for k in 0..num_slices {
            let plane = image.data().clone().narrow(0, k, 1);
            let mask_plane = mask.map(|m| m.clone().narrow(0, k, 1));

            let origin = image
                .transform_continuous_index_to_physical_point(&Point3::new([0.0, 0.0, k as f64]));
            let placement = super::Placement::new(*image.direction(), origin);

            slices.push(Slice::new(
                plane,
                mask_plane,
                *image.spacing(),
                placement,
                filename.clone(),
                k,
            )?);
        }

        Ok(Self { slices, filename })
    }

    /// The slices, in stack order.
    pub fn slices(&self) -> &[Slice<B>] {
        &self.slices
    }

    /// Mutable access to the slices, in stack order.
    pub fn slices_mut(&mut self) -> &mut [Slice<B>] {
        &mut self.slices
    }

    /// Number of slices.
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    /// Name of the volume this stack was built from.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Direction3, Spacing3};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn volume() -> Image<TestBackend, 3> {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::zeros([3, 4, 5], &device);
        Image::new(
            data,
            Point3::new([10.0, 20.0, 30.0]),
            Spacing3::new([1.0, 1.0, 2.0]),
            Direction3::identity(),
        )
    }

    #[test]
    fn test_from_image_splits_planes() {
        let stack = Stack::from_image(&volume(), None, "volume").unwrap();
        assert_eq!(stack.num_slices(), 3);

        for (k, slice) in stack.slices().iter().enumerate() {
            assert_eq!(slice.data().dims(), [1, 4, 5]);
            assert_eq!(slice.index(), k);
            // Plane k sits at z = 30 + 2k
            assert_eq!(
                slice.placement().origin().to_vec(),
                vec![10.0, 20.0, 30.0 + 2.0 * k as f64]
            );
        }
    }

    #[test]
    fn test_from_image_rejects_mismatched_mask() {
        let device = Default::default();
        let mask = Tensor::<TestBackend, 3>::ones([3, 4, 4], &device);
        let result = Stack::from_image(&volume(), Some(&mask), "volume");
        assert!(matches!(result, Err(StackError::MaskShapeMismatch { .. })));
    }

    #[test]
    fn test_from_stack_copy_is_independent() {
        let stack = Stack::from_image(&volume(), None, "volume").unwrap();
        let mut copy = Stack::from_stack(&stack, Some("volume_registered".into()));

        let shift = crate::transform::AffineTransform::new(
            nalgebra::Matrix3::identity(),
            nalgebra::Vector3::new(0.0, 0.0, 1.0),
        );
        copy.slices_mut()[0].update_motion_correction(&shift);

        assert_eq!(copy.filename(), "volume_registered");
        assert_ne!(
            copy.slices()[0].placement().origin(),
            stack.slices()[0].placement().origin()
        );
    }

    #[test]
    fn test_empty_stack_rejected() {
        let result = Stack::<TestBackend>::new(Vec::new(), "volume");
        assert!(matches!(result, Err(StackError::EmptyStack)));
    }
}
