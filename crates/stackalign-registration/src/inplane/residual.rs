//! Chained slice-to-slice residual model.

use super::projection::ProjectedSlice;
use crate::error::{RegistrationError, Result};
use crate::solver::ResidualFunction;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DVector;
use stackalign_core::filter::ResampleImageFilter;
use stackalign_core::image::Image;
use stackalign_core::interpolation::LinearInterpolator;
use stackalign_core::transform::Euler2D;

/// Degrees of freedom per non-reference slice: rotation angle plus a 2D
/// translation.
pub const DOF_PER_SLICE: usize = 3;

/// State shared by every residual evaluation.
///
/// Holds the projected 2D slices, the fixed reference grid derived from
/// slice 0, and one 2D rigid transform template per non-reference slice.
/// All of it is read-only during the solve, which keeps evaluations pure
/// and bit-for-bit reproducible.
pub struct ResidualContext<B: Backend> {
    projected: Vec<ProjectedSlice<B>>,
    reference: Image<B, 2>,
    templates: Vec<Euler2D>,
    anchor: Vec<f64>,
}

impl<B: Backend> ResidualContext<B> {
    /// Build the context from the projected slices.
    ///
    /// Slice 0 is the chain anchor: its geometry becomes the reference
    /// grid onto which every other slice is resampled, and its pixels are
    /// never transformed.
    pub fn new(projected: Vec<ProjectedSlice<B>>) -> Result<Self> {
        if projected.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "residual model requires at least one projected slice",
            ));
        }

        let reference = projected[0].image().clone();
        let anchor = tensor_to_f64(reference.data());
        let templates = vec![Euler2D::identity(); projected.len() - 1];

        Ok(Self {
            projected,
            reference,
            templates,
            anchor,
        })
    }

    /// Number of slices in the chain.
    pub fn num_slices(&self) -> usize {
        self.projected.len()
    }

    /// Length of the flattened parameter vector, `3 * (N - 1)`.
    pub fn num_parameters(&self) -> usize {
        DOF_PER_SLICE * self.templates.len()
    }

    /// Length of the residual vector, `(N - 1) * |reference grid|`.
    pub fn residual_len(&self) -> usize {
        self.templates.len() * self.reference.num_pixels()
    }

    /// The fixed reference grid.
    pub fn reference(&self) -> &Image<B, 2> {
        &self.reference
    }

    /// Evaluate the chained residual at the given flattened parameters.
    ///
    /// The vector is reshaped into `(N - 1)` groups of `(angle, tx, ty)`,
    /// slice i is resampled onto the reference grid under its candidate
    /// transform, and block `i - 1` of the output is the flattened
    /// difference against the previous slice in the chain. The resampled
    /// right operand of one pair becomes the left operand of the next, so
    /// pairing order matters and is kept strictly `(i - 1, i)`.
    pub fn residuals(&self, parameters: &DVector<f64>) -> Result<DVector<f64>> {
        if parameters.len() != self.num_parameters() {
            return Err(RegistrationError::ShapeMismatch {
                expected: vec![self.num_parameters()],
                actual: vec![parameters.len()],
            });
        }

        let mut out = Vec::with_capacity(self.residual_len());
        let mut previous = self.anchor.clone();

        for (pair, template) in self.templates.iter().enumerate() {
            let slice_index = pair + 1;
            let group = [
                parameters[pair * DOF_PER_SLICE],
                parameters[pair * DOF_PER_SLICE + 1],
                parameters[pair * DOF_PER_SLICE + 2],
            ];

            let mut transform = *template;
            transform.set_parameters(&group);

            let filter = ResampleImageFilter::new_from_reference(
                &self.reference,
                transform,
                LinearInterpolator::new(),
            );
            let resampled = filter.apply(self.projected[slice_index].image());
            let current = tensor_to_f64(resampled.data());

            for (a, b) in previous.iter().zip(current.iter()) {
                let difference = a - b;
                if !difference.is_finite() {
                    return Err(RegistrationError::NonFiniteResidual {
                        slice_index,
                        parameters: group.to_vec(),
                    });
                }
                out.push(difference);
            }

            previous = current;
        }

        Ok(DVector::from_vec(out))
    }
}

impl<B: Backend> ResidualFunction for ResidualContext<B> {
    fn evaluate(&self, parameters: &DVector<f64>) -> Result<DVector<f64>> {
        self.residuals(parameters)
    }
}

fn tensor_to_f64<B: Backend>(data: &Tensor<B, 2>) -> Vec<f64> {
    data.clone()
        .into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .expect("tensor data converts to f64")
}
