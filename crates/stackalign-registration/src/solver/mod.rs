//! Nonlinear least-squares solver used to fit the per-slice transforms.
//!
//! The driver minimizes `0.5 * sum(rho(r_i^2))` over a residual function
//! with a finite-difference Jacobian and a Gauss-Newton model of the
//! objective. Step control is selected by [`Method`], robustification by
//! [`Loss`]; the default pairing is a rectangular trust region with plain
//! squared residuals.

pub mod least_squares;

pub use least_squares::{least_squares, LeastSquaresFit, ResidualFunction, TerminationReason};

use nalgebra::DVector;

/// Step-control strategy for the least-squares iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Dogleg steps inside a rectangular trust region, intersected with
    /// the bounds. Default.
    #[default]
    Dogbox,
    /// Dogleg steps inside a spherical trust region; steps are clipped
    /// into the bounds.
    TrustRegionReflective,
    /// Classic Levenberg-Marquardt damping; steps are clipped into the
    /// bounds.
    LevenbergMarquardt,
}

/// Loss function applied to squared residuals.
///
/// Robust losses are applied through iteratively reweighted least squares:
/// residual rows and matching Jacobian rows are scaled by
/// `sqrt(rho'(z))` with `z = (r / f_scale)^2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loss {
    /// Plain sum of squared residuals. Default.
    #[default]
    Linear,
    /// Smooth approximation of the absolute value, `2 (sqrt(1 + z) - 1)`.
    SoftL1,
    /// Quadratic near zero, linear for `z > 1`.
    Huber,
}

impl Loss {
    /// `rho(z)` evaluated at `z = (r / f_scale)^2`.
    pub(crate) fn rho(&self, z: f64) -> f64 {
        match self {
            Loss::Linear => z,
            Loss::SoftL1 => 2.0 * ((1.0 + z).sqrt() - 1.0),
            Loss::Huber => {
                if z <= 1.0 {
                    z
                } else {
                    2.0 * z.sqrt() - 1.0
                }
            }
        }
    }

    /// IRLS weight `sqrt(rho'(z))`.
    pub(crate) fn weight(&self, z: f64) -> f64 {
        match self {
            Loss::Linear => 1.0,
            Loss::SoftL1 => (1.0 + z).powf(-0.25),
            Loss::Huber => {
                if z <= 1.0 {
                    1.0
                } else {
                    z.powf(-0.25)
                }
            }
        }
    }
}

/// Configuration of the least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquaresOptions {
    /// Step-control strategy.
    pub method: Method,
    /// Loss applied to squared residuals.
    pub loss: Loss,
    /// Residual scale at which robust losses start to flatten.
    pub f_scale: f64,
    /// Optional box constraints `(lower, upper)` on the parameters.
    pub bounds: Option<(DVector<f64>, DVector<f64>)>,
    /// Maximum outer iterations before the solve is declared failed.
    pub max_iterations: usize,
    /// Relative tolerance on the cost reduction.
    pub ftol: f64,
    /// Relative tolerance on the step size.
    pub xtol: f64,
    /// Tolerance on the infinity norm of the gradient.
    pub gtol: f64,
    /// Relative step used by the finite-difference Jacobian.
    pub diff_step: f64,
}

impl Default for LeastSquaresOptions {
    fn default() -> Self {
        Self {
            method: Method::default(),
            loss: Loss::default(),
            f_scale: 1.0,
            bounds: None,
            max_iterations: 100,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            diff_step: f64::EPSILON.sqrt(),
        }
    }
}
