//! Slice placement in physical space.

use crate::spatial::{Direction3, Point3};
use crate::transform::AffineTransform;
use serde::{Deserialize, Serialize};

/// Where a slice plane sits in 3D physical space.
///
/// Direction and origin are owned as a single value so that a slice and its
/// mask can never disagree about geometry: a slice stores one `Placement`
/// governing both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    direction: Direction3,
    origin: Point3,
}

impl Placement {
    /// Create a new placement.
    pub fn new(direction: Direction3, origin: Point3) -> Self {
        Self { direction, origin }
    }

    /// Axis-aligned placement at the physical origin.
    pub fn canonical() -> Self {
        Self {
            direction: Direction3::identity(),
            origin: Point3::origin(),
        }
    }

    /// Orientation of the slice axes.
    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    /// Physical coordinate of the first voxel.
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Affine transform carrying the canonical axis-aligned frame onto this
    /// placement: matrix from the direction, translation from the origin.
    pub fn to_affine(&self) -> AffineTransform<3> {
        AffineTransform::from_direction_origin(&self.direction, &self.origin)
    }

    /// Apply a physical-space affine transform to the placement in place.
    ///
    /// The direction is premultiplied by the linear part and the origin is
    /// mapped through the full transform.
    pub fn apply(&mut self, transform: &AffineTransform<3>) {
        self.direction = Direction3::from_matrix(transform.matrix() * self.direction.inner());
        self.origin = transform.transform_point(&self.origin);
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Vector3};

    #[test]
    fn test_canonical_roundtrip() {
        let placement = Placement::canonical();
        let affine = placement.to_affine();
        let p = crate::spatial::Point3::new([1.0, 2.0, 3.0]);
        assert_eq!(affine.transform_point(&p), p);
    }

    #[test]
    fn test_apply_translation() {
        let mut placement = Placement::canonical();
        let shift = AffineTransform::new(Matrix3::identity(), Vector3::new(1.0, -2.0, 3.0));
        placement.apply(&shift);

        assert_eq!(placement.origin().to_vec(), vec![1.0, -2.0, 3.0]);
        assert_eq!(placement.direction(), &Direction3::identity());
    }

    #[test]
    fn test_apply_rotation_updates_direction() {
        let mut placement = Placement::canonical();
        // 90 degrees around z
        let rot = AffineTransform::new(
            Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            Vector3::zeros(),
        );
        placement.apply(&rot);

        assert_eq!(placement.direction()[(0, 1)], -1.0);
        assert_eq!(placement.direction()[(1, 0)], 1.0);
    }
}
