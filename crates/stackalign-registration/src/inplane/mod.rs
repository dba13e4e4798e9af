//! In-plane registration pipeline.
//!
//! Chains the per-stage building blocks: placement alignment, slice
//! projection, the chained residual model, the least-squares solve, and
//! the correction composer.

pub mod alignment;
pub mod composer;
pub mod projection;
pub mod residual;

pub use alignment::placement_alignment_transforms;
pub use composer::apply_motion_correction;
pub use projection::{project_slices, ProjectedSlice};
pub use residual::{ResidualContext, DOF_PER_SLICE};

use crate::error::{RegistrationError, Result};
use crate::solver::{least_squares, LeastSquaresFit, LeastSquaresOptions};
use burn::tensor::backend::Backend;
use nalgebra::{DMatrix, DVector};
use stackalign_core::transform::AffineTransform;
use stackalign_core::Stack;

/// Configuration of the in-plane registration pipeline.
#[derive(Debug, Clone, Default)]
pub struct InPlaneRegistrationConfig {
    /// Multiply projected slices by their masks before registration.
    pub use_mask: bool,
    /// Solver configuration (method, loss, tolerances, bounds).
    pub solver: LeastSquaresOptions,
}

/// Slice-to-slice in-plane motion correction of one stack.
///
/// Slice 0 is the fixed reference of the chain; every other slice gets one
/// 2D rigid transform, fitted jointly over all slices by nonlinear least
/// squares on consecutive-slice differences. The fitted corrections are
/// composed back into 3D affine updates of each slice's placement and
/// applied to a fresh copy of the stack.
///
/// ```ignore
/// let mut registration = InPlaneRegistration::new(stack, Default::default())?;
/// registration.run()?;
/// let corrected = registration.corrected_stack().unwrap();
/// ```
pub struct InPlaneRegistration<B: Backend> {
    stack: Stack<B>,
    config: InPlaneRegistrationConfig,
    parameters: Option<DMatrix<f64>>,
    transforms: Vec<AffineTransform<3>>,
    corrected: Option<Stack<B>>,
    fit: Option<LeastSquaresFit>,
}

impl<B: Backend> InPlaneRegistration<B> {
    /// Create a registration for the given stack.
    ///
    /// Fails fast when mask weighting is requested but a slice carries no
    /// mask.
    pub fn new(stack: Stack<B>, config: InPlaneRegistrationConfig) -> Result<Self> {
        if config.use_mask {
            if let Some(slice) = stack.slices().iter().find(|s| s.mask().is_none()) {
                return Err(RegistrationError::invalid_configuration(format!(
                    "mask weighting enabled but slice {} has no mask",
                    slice.index()
                )));
            }
        }
        Ok(Self {
            stack,
            config,
            parameters: None,
            transforms: Vec::new(),
            corrected: None,
            fit: None,
        })
    }

    /// Run the registration pipeline end to end.
    pub fn run(&mut self) -> Result<()> {
        let num_slices = self.stack.num_slices();

        let alignments = placement_alignment_transforms(&self.stack)?;
        let projected = project_slices(&self.stack, &alignments, self.config.use_mask)?;
        let context = ResidualContext::new(projected)?;

        tracing::info!(
            slices = num_slices,
            parameters = context.num_parameters(),
            residuals = context.residual_len(),
            "starting in-plane registration"
        );

        let initial = DVector::zeros(context.num_parameters());
        let fit = least_squares(&context, initial, &self.config.solver)?;

        tracing::info!(
            cost = fit.cost,
            iterations = fit.iterations,
            evaluations = fit.evaluations,
            elapsed_ms = fit.elapsed.as_millis() as u64,
            "in-plane solve finished"
        );

        // Prepend the implicit zero row of the reference slice.
        let mut parameters = DMatrix::zeros(num_slices, DOF_PER_SLICE);
        for i in 1..num_slices {
            for j in 0..DOF_PER_SLICE {
                parameters[(i, j)] = fit.solution[(i - 1) * DOF_PER_SLICE + j];
            }
        }

        let (corrected, transforms) =
            apply_motion_correction(&self.stack, &alignments, &parameters)?;

        self.parameters = Some(parameters);
        self.transforms = transforms;
        self.corrected = Some(corrected);
        self.fit = Some(fit);
        Ok(())
    }

    /// The input stack.
    pub fn stack(&self) -> &Stack<B> {
        &self.stack
    }

    /// Fitted parameter matrix `N x 3` with the zero reference row, once
    /// [`run`](Self::run) has completed.
    pub fn parameters(&self) -> Option<&DMatrix<f64>> {
        self.parameters.as_ref()
    }

    /// The N applied 3D corrections, once [`run`](Self::run) has completed.
    pub fn transforms(&self) -> &[AffineTransform<3>] {
        &self.transforms
    }

    /// The corrected stack, once [`run`](Self::run) has completed.
    pub fn corrected_stack(&self) -> Option<&Stack<B>> {
        self.corrected.as_ref()
    }

    /// Solver diagnostics, once [`run`](Self::run) has completed.
    pub fn fit(&self) -> Option<&LeastSquaresFit> {
        self.fit.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;
    use stackalign_core::spatial::{Direction3, Point3, Spacing3};
    use stackalign_core::{Placement, Slice};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mask_weighting_requires_masks() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::zeros([1, 4, 4], &device);
        let slice = Slice::new(
            data,
            None,
            Spacing3::uniform(1.0),
            Placement::new(Direction3::identity(), Point3::origin()),
            "volume",
            0,
        )
        .unwrap();
        let stack = Stack::new(vec![slice], "volume").unwrap();

        let config = InPlaneRegistrationConfig {
            use_mask: true,
            ..Default::default()
        };
        assert!(matches!(
            InPlaneRegistration::new(stack, config),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }
}
