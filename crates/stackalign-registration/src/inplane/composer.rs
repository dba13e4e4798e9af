//! Composition of fitted 2D parameters into 3D motion corrections.

use crate::error::{RegistrationError, Result};
use burn::tensor::backend::Backend;
use nalgebra::DMatrix;
use stackalign_core::transform::{AffineTransform, Euler2D, Euler3D};
use stackalign_core::Stack;

/// Map fitted in-plane parameters back into per-slice 3D corrections and
/// apply them to a fresh copy of the stack.
///
/// For slice i with parameter row `(angle, tx, ty)`:
/// the fitted transform maps reference to slice, so the correction is its
/// inverse, expanded to 3D and conjugated with the slice's alignment
/// transform: `A_final = PP_i^-1 . (T3d . PP_i)`. Applying the alignment
/// first and re-expressing the result in the original physical frame makes
/// the correction act within the slice plane wherever that plane sits.
///
/// Returns the corrected stack together with the N applied transforms.
/// Row 0 is always zero, so transform 0 reduces to the identity.
pub fn apply_motion_correction<B: Backend>(
    stack: &Stack<B>,
    alignments: &[AffineTransform<3>],
    parameters: &DMatrix<f64>,
) -> Result<(Stack<B>, Vec<AffineTransform<3>>)> {
    let num_slices = stack.num_slices();
    if alignments.len() != num_slices || parameters.nrows() != num_slices || parameters.ncols() != 3
    {
        return Err(RegistrationError::ShapeMismatch {
            expected: vec![num_slices, 3],
            actual: vec![alignments.len(), parameters.nrows(), parameters.ncols()],
        });
    }

    let mut corrected = Stack::from_stack(
        stack,
        Some(format!("{}_registered", stack.filename())),
    );
    let mut transforms = Vec::with_capacity(num_slices);

    for (i, slice) in corrected.slices_mut().iter_mut().enumerate() {
        let mut rigid = Euler2D::identity();
        rigid.set_parameters(&[parameters[(i, 0)], parameters[(i, 1)], parameters[(i, 2)]]);
        let rigid = rigid.inverse();

        let in_plane = Euler3D::from_in_plane(&rigid).to_affine();

        let alignment_inverse = alignments[i].try_inverse().ok_or_else(|| {
            RegistrationError::singular_transform(format!(
                "alignment transform of slice {i} is not invertible"
            ))
        })?;

        let corrected_in_canonical = AffineTransform::compose(&in_plane, &alignments[i]);
        let correction = AffineTransform::compose(&alignment_inverse, &corrected_in_canonical);

        slice.update_motion_correction(&correction);
        transforms.push(correction);
    }

    Ok((corrected, transforms))
}
