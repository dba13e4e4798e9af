//! Per-slice placement alignment transforms.

use crate::error::{RegistrationError, Result};
use burn::tensor::backend::Backend;
use stackalign_core::transform::AffineTransform;
use stackalign_core::Stack;

/// Derive the alignment transform of every slice in the stack.
///
/// For a slice placed by (direction, origin), the placement affine maps the
/// canonical axis-aligned frame onto the slice's physical position; its
/// inverse, returned here, carries the slice back into the canonical frame.
/// The list is index-aligned with the stack.
pub fn placement_alignment_transforms<B: Backend>(
    stack: &Stack<B>,
) -> Result<Vec<AffineTransform<3>>> {
    stack
        .slices()
        .iter()
        .map(|slice| {
            slice.placement().to_affine().try_inverse().ok_or_else(|| {
                RegistrationError::singular_transform(format!(
                    "placement of slice {} is not invertible",
                    slice.index()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::Tensor;
    use stackalign_core::spatial::{Direction3, Point3, Spacing3};
    use stackalign_core::{Placement, Slice, Stack};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_alignment_undoes_placement() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        let placement = Placement::new(Direction3::identity(), Point3::new([3.0, -1.0, 7.0]));
        let slice = Slice::new(
            data,
            None,
            Spacing3::uniform(1.0),
            placement,
            "volume",
            0,
        )
        .unwrap();
        let stack = Stack::new(vec![slice], "volume").unwrap();

        let alignments = placement_alignment_transforms(&stack).unwrap();
        assert_eq!(alignments.len(), 1);

        let back = alignments[0].transform_point(&Point3::new([3.0, -1.0, 7.0]));
        assert!(back.to_vec().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_singular_placement_is_fatal() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        let placement = Placement::new(Direction3::zeros(), Point3::origin());
        let slice = Slice::new(
            data,
            None,
            Spacing3::uniform(1.0),
            placement,
            "volume",
            0,
        )
        .unwrap();
        let stack = Stack::new(vec![slice], "volume").unwrap();

        assert!(matches!(
            placement_alignment_transforms(&stack),
            Err(RegistrationError::SingularTransform(_))
        ));
    }
}
