//! 2D rigid transform (rotation about a fixed center + translation).

use super::affine::AffineTransform;
use super::trait_::Transform;
use crate::spatial::{Point2, Vector2};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

/// 2D rigid transform `T(x) = R(angle)(x - c) + c + t`.
///
/// Parameters are ordered `(angle, tx, ty)`; the rotation center is a fixed
/// parameter that does not take part in optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Euler2D {
    angle: f64,
    translation: Vector2,
    center: Point2,
}

impl Euler2D {
    /// Create a new 2D rigid transform.
    pub fn new(angle: f64, translation: Vector2, center: Point2) -> Self {
        Self {
            angle,
            translation,
            center,
        }
    }

    /// Identity transform with the rotation center at the origin.
    pub fn identity() -> Self {
        Self {
            angle: 0.0,
            translation: Vector2::zeros(),
            center: Point2::origin(),
        }
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Translation component.
    pub fn translation(&self) -> &Vector2 {
        &self.translation
    }

    /// Fixed rotation center.
    pub fn center(&self) -> &Point2 {
        &self.center
    }

    /// Set the optimizable parameters `(angle, tx, ty)`.
    pub fn set_parameters(&mut self, parameters: &[f64; 3]) {
        self.angle = parameters[0];
        self.translation[0] = parameters[1];
        self.translation[1] = parameters[2];
    }

    /// Get the optimizable parameters `(angle, tx, ty)`.
    pub fn parameters(&self) -> [f64; 3] {
        [self.angle, self.translation[0], self.translation[1]]
    }

    /// Rotation matrix for the current angle.
    pub fn rotation_matrix(&self) -> Matrix2<f64> {
        let (s, c) = self.angle.sin_cos();
        Matrix2::new(c, -s, s, c)
    }

    /// Invert the transform, keeping the same rotation center.
    ///
    /// With `T(x) = R(x - c) + c + t` the inverse is the rigid transform
    /// with angle `-angle` and translation `-R^-1 t` about the same center.
    pub fn inverse(&self) -> Self {
        let r_inv = Matrix2::new(
            self.angle.cos(),
            self.angle.sin(),
            -self.angle.sin(),
            self.angle.cos(),
        );
        let t = r_inv * self.translation.inner();
        Self {
            angle: -self.angle,
            translation: Vector2::new([-t[0], -t[1]]),
            center: self.center,
        }
    }

    /// Convert to canonical affine form, folding the center into the
    /// translation.
    pub fn to_affine(&self) -> AffineTransform<2> {
        let r = self.rotation_matrix();
        let c = self.center.inner().coords;
        let t = c + self.translation.inner() - r * c;
        AffineTransform::new(r, t)
    }
}

impl Default for Euler2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend> Transform<B, 2> for Euler2D {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.to_affine().transform_points(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_parameters_roundtrip() {
        let mut t = Euler2D::identity();
        t.set_parameters(&[0.3, 1.5, -2.0]);
        assert_eq!(t.parameters(), [0.3, 1.5, -2.0]);
    }

    #[test]
    fn test_rotation_about_center() {
        let t = Euler2D::new(FRAC_PI_2, Vector2::zeros(), Point2::new([1.0, 1.0]));
        // (2, 1) is one unit right of the center, rotates to one unit above.
        let p = t.to_affine().transform_point(&Point2::new([2.0, 1.0]));
        assert!((p[0] - 1.0).abs() < 1e-12);
        assert!((p[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = Euler2D::new(0.4, Vector2::new([2.0, -1.0]), Point2::new([3.0, 5.0]));
        let inv = t.inverse();
        let p = Point2::new([1.5, -0.5]);
        let back = inv.to_affine().transform_point(&t.to_affine().transform_point(&p));
        assert!((back[0] - p[0]).abs() < 1e-12);
        assert!((back[1] - p[1]).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_keeps_center() {
        let t = Euler2D::new(0.4, Vector2::new([2.0, -1.0]), Point2::new([3.0, 5.0]));
        assert_eq!(t.inverse().center(), t.center());
        assert!((t.inverse().angle() + t.angle()).abs() < 1e-12);
    }
}
