//! A single 2D slice embedded in 3D physical space.

use super::placement::Placement;
use super::StackError;
use crate::image::Image;
use crate::spatial::Spacing3;
use crate::transform::AffineTransform;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// One 2D image plane embedded in 3D physical space.
///
/// The pixel data is stored as a single-plane 3D tensor `[1, H, W]` together
/// with an optional binary mask of identical shape. Image and mask share one
/// [`Placement`], so their geometry cannot diverge.
#[derive(Debug, Clone)]
pub struct Slice<B: Backend> {
    data: Tensor<B, 3>,
    mask: Option<Tensor<B, 3>>,
    spacing: Spacing3,
    placement: Placement,
    filename: String,
    index: usize,
}

impl<B: Backend> Slice<B> {
    /// Create a slice from raw pixel data plus metadata.
    ///
    /// Fails fast when the data is not a single plane or the mask shape
    /// does not match the data shape.
    pub fn new(
        data: Tensor<B, 3>,
        mask: Option<Tensor<B, 3>>,
        spacing: Spacing3,
        placement: Placement,
        filename: impl Into<String>,
        index: usize,
    ) -> Result<Self, StackError> {
        let shape = data.dims();
        if shape[0] != 1 {
            return Err(StackError::NotSinglePlane {
                shape: shape.to_vec(),
            });
        }
        if let Some(mask) = &mask {
            if mask.dims() != shape {
                return Err(StackError::MaskShapeMismatch {
                    slice: shape.to_vec(),
                    mask: mask.dims().to_vec(),
                });
            }
        }
        Ok(Self {
            data,
            mask,
            spacing,
            placement,
            filename: filename.into(),
            index,
        })
    }

    /// Create a copy of an existing slice.
    pub fn from_slice(slice: &Slice<B>) -> Self {
        slice.clone()
    }

    /// Pixel data `[1, H, W]`.
    pub fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    /// Mask data `[1, H, W]`, if present.
    pub fn mask(&self) -> Option<&Tensor<B, 3>> {
        self.mask.as_ref()
    }

    /// Voxel spacing `(x, y, z)`.
    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    /// Current placement in physical space (shared by image and mask).
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Replace the placement, atomically for image and mask.
    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    /// Source filename this slice was cut from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Index of this slice within its stack.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Assemble an [`Image`] view of the pixel data.
    pub fn image(&self) -> Image<B, 3> {
        Image::new(
            self.data.clone(),
            *self.placement.origin(),
            self.spacing,
            *self.placement.direction(),
        )
    }

    /// Assemble an [`Image`] view of the mask, if present.
    pub fn mask_image(&self) -> Option<Image<B, 3>> {
        self.mask.as_ref().map(|mask| {
            Image::new(
                mask.clone(),
                *self.placement.origin(),
                self.spacing,
                *self.placement.direction(),
            )
        })
    }

    /// Apply a motion-correction transform to the stored placement in place.
    ///
    /// Pixel content is never touched; only where the slice sits in
    /// physical space changes.
    pub fn update_motion_correction(&mut self, transform: &AffineTransform<3>) {
        self.placement.apply(transform);
    }
}
