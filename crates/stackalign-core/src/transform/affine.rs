//! Affine transform implementation.

use super::trait_::Transform;
use crate::spatial::{Direction, Point};
use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

/// Affine transform `T(x) = M x + t` in canonical (center-free) form.
///
/// Rotation centers of rigid transforms are folded into the translation
/// when converting to this type, which keeps composition and inversion
/// plain matrix algebra. Composition is associative but not commutative,
/// so callers must keep outer/inner order straight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: SVector<f64, D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create a new affine transform from a matrix and a translation.
    pub fn new(matrix: SMatrix<f64, D, D>, translation: SVector<f64, D>) -> Self {
        Self {
            matrix,
            translation,
        }
    }

    /// Create an identity affine transform.
    pub fn identity() -> Self {
        Self {
            matrix: SMatrix::identity(),
            translation: SVector::zeros(),
        }
    }

    /// Build an affine transform from an orientation matrix and an origin.
    ///
    /// The result maps the canonical axis-aligned frame onto the placement
    /// described by `direction` and `origin`.
    pub fn from_direction_origin(direction: &Direction<D>, origin: &Point<D>) -> Self {
        Self {
            matrix: *direction.inner(),
            translation: origin.inner().coords,
        }
    }

    /// Get the linear part.
    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    /// Get the translation part.
    pub fn translation(&self) -> &SVector<f64, D> {
        &self.translation
    }

    /// Compose two transforms: `inner` is applied first, `outer` second.
    ///
    /// The result is point-wise equivalent to `outer(inner(x))`.
    pub fn compose(outer: &Self, inner: &Self) -> Self {
        Self {
            matrix: outer.matrix * inner.matrix,
            translation: outer.matrix * inner.translation + outer.translation,
        }
    }

    /// Try to invert the transform.
    ///
    /// Returns `None` when the linear part is singular. Valid rigid and
    /// affine placements are always invertible, so a `None` here signals a
    /// precondition violation that callers surface as a fatal error.
    pub fn try_inverse(&self) -> Option<Self> {
        let inv = self.matrix.try_inverse()?;
        Some(Self {
            matrix: inv,
            translation: -(inv * self.translation),
        })
    }

    /// Apply the transform to a single point.
    pub fn transform_point(&self, point: &Point<D>) -> Point<D> {
        let mapped = self.matrix * point.inner().coords + self.translation;
        let mut out = Point::origin();
        for i in 0..D {
            out[i] = mapped[i];
        }
        out
    }

    /// Check that matrix and translation entries are finite.
    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite()) && self.translation.iter().all(|v| v.is_finite())
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row-vector form: y = x @ M^T + t
        let device = points.device();

        let mut m_data = Vec::with_capacity(D * D);
        // Writing M row-major transposed yields M^T in row-major layout.
        for c in 0..D {
            for r in 0..D {
                m_data.push(self.matrix[(r, c)]);
            }
        }
        let m_t =
            Tensor::<B, 1>::from_data(TensorData::new(m_data, Shape::new([D * D])), &device)
                .reshape([D, D]);

        let t_data: Vec<f64> = (0..D).map(|i| self.translation[i]).collect();
        let t = Tensor::<B, 1>::from_data(TensorData::new(t_data, Shape::new([D])), &device)
            .reshape([1, D]);

        points.matmul(m_t) + t
    }
}
