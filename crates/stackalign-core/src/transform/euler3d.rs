//! 3D rigid transform with Euler-angle rotation.

use super::affine::AffineTransform;
use super::euler2d::Euler2D;
use super::trait_::Transform;
use crate::spatial::{Point3, Vector3};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// 3D rigid transform `T(x) = R(x - c) + c + t`.
///
/// Rotation uses Euler angles `(rx, ry, rz)` with `R = Rz * Ry * Rx`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Euler3D {
    rotation: [f64; 3],
    translation: Vector3,
    center: Point3,
}

impl Euler3D {
    /// Create a new 3D rigid transform.
    pub fn new(rotation: [f64; 3], translation: Vector3, center: Point3) -> Self {
        Self {
            rotation,
            translation,
            center,
        }
    }

    /// Identity transform with the rotation center at the origin.
    pub fn identity() -> Self {
        Self {
            rotation: [0.0; 3],
            translation: Vector3::zeros(),
            center: Point3::origin(),
        }
    }

    /// Expand a 2D rigid transform into the equivalent in-plane 3D rigid
    /// transform.
    ///
    /// The rotation is restricted to the z-axis by the 2D angle, the
    /// translation becomes `(tx, ty, 0)` and the center `(cx, cy, 0)`.
    /// This assumes the 2D plane is the x-y plane of the local 3D frame,
    /// which slice projection guarantees for projected slices.
    pub fn from_in_plane(rigid: &Euler2D) -> Self {
        let [angle, tx, ty] = rigid.parameters();
        let center = rigid.center();
        Self {
            rotation: [0.0, 0.0, angle],
            translation: Vector3::new([tx, ty, 0.0]),
            center: Point3::new([center[0], center[1], 0.0]),
        }
    }

    /// Euler angles `(rx, ry, rz)` in radians.
    pub fn rotation(&self) -> [f64; 3] {
        self.rotation
    }

    /// Translation component.
    pub fn translation(&self) -> &Vector3 {
        &self.translation
    }

    /// Fixed rotation center.
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Rotation matrix `R = Rz * Ry * Rx` for the current angles.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        let (sx, cx) = self.rotation[0].sin_cos();
        let (sy, cy) = self.rotation[1].sin_cos();
        let (sz, cz) = self.rotation[2].sin_cos();

        Matrix3::new(
            cz * cy,
            cz * sy * sx - sz * cx,
            cz * sy * cx + sz * sx,
            sz * cy,
            sz * sy * sx + cz * cx,
            sz * sy * cx - cz * sx,
            -sy,
            cy * sx,
            cy * cx,
        )
    }

    /// Convert to canonical affine form, folding the center into the
    /// translation.
    pub fn to_affine(&self) -> AffineTransform<3> {
        let r = self.rotation_matrix();
        let c = self.center.inner().coords;
        let t = c + self.translation.inner() - r * c;
        AffineTransform::new(r, t)
    }
}

impl Default for Euler3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B, 3> for Euler3D {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_affine().transform_points(points)
    }
}
