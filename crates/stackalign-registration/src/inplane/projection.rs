//! Projection of 3D slices onto the canonical 2D plane.

use crate::error::{RegistrationError, Result};
use burn::tensor::backend::Backend;
use nalgebra::Matrix3;
use stackalign_core::image::Image;
use stackalign_core::spatial::{Direction2, Direction3, Point2, Point3, Spacing2};
use stackalign_core::transform::AffineTransform;
use stackalign_core::{Placement, Slice, Stack};

/// A slice projected onto the canonical x-y plane: a 2D image plus the
/// identifying metadata carried over from the 3D slice.
#[derive(Debug, Clone)]
pub struct ProjectedSlice<B: Backend> {
    image: Image<B, 2>,
    filename: String,
    index: usize,
}

impl<B: Backend> ProjectedSlice<B> {
    /// The projected 2D image.
    pub fn image(&self) -> &Image<B, 2> {
        &self.image
    }

    /// Source filename propagated from the 3D slice.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Stack index propagated from the 3D slice.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Project every slice of the stack into its local 2D in-plane frame.
///
/// For each slice a copy is re-placed so that its alignment transform maps
/// it onto the canonical frame, then the single z plane is extracted as a
/// 2D image. With `weight_by_mask` the extracted image is multiplied
/// pixel-wise by the extracted 2D mask.
///
/// The resulting sequence is geometrically consistent: every projected
/// slice lies in the same plane and can be compared after resampling onto
/// a common grid.
pub fn project_slices<B: Backend>(
    stack: &Stack<B>,
    alignments: &[AffineTransform<3>],
    weight_by_mask: bool,
) -> Result<Vec<ProjectedSlice<B>>> {
    if alignments.len() != stack.num_slices() {
        return Err(RegistrationError::ShapeMismatch {
            expected: vec![stack.num_slices()],
            actual: vec![alignments.len()],
        });
    }

    stack
        .slices()
        .iter()
        .zip(alignments.iter())
        .map(|(slice, alignment)| project_slice(slice, alignment, weight_by_mask))
        .collect()
}

fn project_slice<B: Backend>(
    slice: &Slice<B>,
    alignment: &AffineTransform<3>,
    weight_by_mask: bool,
) -> Result<ProjectedSlice<B>> {
    // Work on a copy; the stack's slice is never mutated.
    let mut slice = Slice::from_slice(slice);
    let spacing = *slice.spacing();

    // Native image-to-physical transform of the slice, spacing included.
    let scale = Matrix3::from_diagonal(&nalgebra::Vector3::new(
        spacing[0], spacing[1], spacing[2],
    ));
    let native = AffineTransform::new(
        slice.placement().direction().inner() * scale,
        slice.placement().origin().inner().coords,
    );

    // Aligned image-to-physical transform, then back out the spacing to
    // recover direction and origin. Image and mask geometry update
    // together through the shared placement.
    let aligned = AffineTransform::compose(alignment, &native);
    let inv_scale = Matrix3::from_diagonal(&nalgebra::Vector3::new(
        1.0 / spacing[0],
        1.0 / spacing[1],
        1.0 / spacing[2],
    ));
    let direction = Direction3::from_matrix(aligned.matrix() * inv_scale);
    let origin = Point3::from_slice(aligned.translation().as_slice());
    slice.set_placement(Placement::new(direction, origin));

    // Extract the single plane as a 2D image.
    let [_, height, width] = slice.data().dims();
    let mut plane = slice.data().clone().reshape([height, width]);

    if weight_by_mask {
        if let Some(mask) = slice.mask() {
            let mask_plane = mask.clone().reshape([height, width]);
            plane = plane * mask_plane;
        }
    }

    let direction_2d =
        Direction2::from_matrix(direction.inner().fixed_view::<2, 2>(0, 0).into_owned());
    let origin_2d = Point2::new([origin[0], origin[1]]);
    let spacing_2d = Spacing2::new([spacing[0], spacing[1]]);

    Ok(ProjectedSlice {
        image: Image::new(plane, origin_2d, spacing_2d, direction_2d),
        filename: slice.filename().to_string(),
        index: slice.index(),
    })
}
