//! Trust-region least-squares driver with a finite-difference Jacobian.

use super::{LeastSquaresOptions, Loss, Method};
use crate::error::{RegistrationError, Result};
use nalgebra::{DMatrix, DVector};
use std::time::{Duration, Instant};

const MAX_STEP_ATTEMPTS: usize = 32;
const MIN_TRUST_RADIUS: f64 = 1e-14;
const MAX_DAMPING: f64 = 1e16;

/// Residual function handed to the solver.
///
/// Implementations must be deterministic and side-effect free; the solver
/// calls `evaluate` repeatedly, including for finite-difference probing.
pub trait ResidualFunction {
    /// Evaluate the residual vector at the given parameters.
    fn evaluate(&self, parameters: &DVector<f64>) -> Result<DVector<f64>>;
}

impl<F> ResidualFunction for F
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>>,
{
    fn evaluate(&self, parameters: &DVector<f64>) -> Result<DVector<f64>> {
        self(parameters)
    }
}

/// Why the iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Relative cost reduction fell below `ftol`.
    CostTolerance,
    /// Step size fell below `xtol`.
    StepTolerance,
    /// Gradient infinity norm fell below `gtol`.
    GradientTolerance,
    /// The problem has no free parameters.
    NoFreeParameters,
}

/// Converged solution plus diagnostics.
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Fitted parameters.
    pub solution: DVector<f64>,
    /// Final cost `0.5 * f_scale^2 * sum(rho((r / f_scale)^2))`.
    pub cost: f64,
    /// Euclidean norm of the final (unweighted) residual.
    pub residual_norm: f64,
    /// Infinity norm of the last computed gradient.
    pub gradient_norm: f64,
    /// Outer iterations performed.
    pub iterations: usize,
    /// Residual evaluations, including finite-difference probes.
    pub evaluations: usize,
    /// Why the iteration stopped.
    pub termination: TerminationReason,
    /// Wall-clock time of the solve.
    pub elapsed: Duration,
}

/// Minimize `0.5 * sum(rho(r(x)^2))` starting from `x0`.
///
/// Returns an error when the residual produces non-finite values, when the
/// normal equations collapse, or when `max_iterations` pass without any
/// tolerance being met. There is no automatic retry from a different
/// starting point.
pub fn least_squares<R: ResidualFunction>(
    residual: &R,
    x0: DVector<f64>,
    options: &LeastSquaresOptions,
) -> Result<LeastSquaresFit> {
    validate_options(options, x0.len())?;
    let start = Instant::now();

    let mut x = clip_to_bounds(x0, options.bounds.as_ref());
    let mut r = evaluate_checked(residual, &x)?;
    let mut evaluations = 1;
    let mut cost = loss_cost(&r, options.loss, options.f_scale);

    let n = x.len();
    if n == 0 {
        return Ok(LeastSquaresFit {
            residual_norm: r.norm(),
            solution: x,
            cost,
            gradient_norm: 0.0,
            iterations: 0,
            evaluations,
            termination: TerminationReason::NoFreeParameters,
            elapsed: start.elapsed(),
        });
    }

    let mut radius = 1.0_f64;
    let mut lambda = 1e-3_f64;
    let mut gradient_norm = f64::INFINITY;
    let mut termination = None;
    let mut iterations = 0;

    while iterations < options.max_iterations && termination.is_none() {
        iterations += 1;

        let jac = numeric_jacobian(residual, &x, &r, options, &mut evaluations)?;
        let (h, g) = weighted_normal_equations(&jac, &r, options.loss, options.f_scale);
        gradient_norm = g.amax();

        if gradient_norm < options.gtol {
            termination = Some(TerminationReason::GradientTolerance);
            break;
        }

        let mut accepted = false;
        for _ in 0..MAX_STEP_ATTEMPTS {
            let step = match options.method {
                Method::LevenbergMarquardt => damped_step(&h, &g, lambda),
                Method::TrustRegionReflective => dogleg_step(&h, &g, radius, StepNorm::Two),
                Method::Dogbox => dogleg_step(&h, &g, radius, StepNorm::Inf),
            }
            .ok_or_else(|| {
                RegistrationError::convergence_failure("normal equations are singular")
            })?;

            let x_new = clip_to_bounds(&x + &step, options.bounds.as_ref());
            let actual_step = &x_new - &x;
            let step_norm = actual_step.norm();

            let r_new = evaluate_checked(residual, &x_new)?;
            evaluations += 1;
            let cost_new = loss_cost(&r_new, options.loss, options.f_scale);

            let predicted = -(g.dot(&actual_step) + 0.5 * actual_step.dot(&(&h * &actual_step)));
            let reduction = cost - cost_new;

            if step_norm > 0.0 && reduction > 0.0 {
                let gain = reduction / predicted.max(f64::MIN_POSITIVE);
                match options.method {
                    Method::LevenbergMarquardt => lambda = (lambda * 0.1).max(1e-12),
                    _ => {
                        let bounded_norm = match options.method {
                            Method::Dogbox => actual_step.amax(),
                            _ => step_norm,
                        };
                        if gain < 0.25 {
                            radius *= 0.25;
                        } else if gain > 0.75 && bounded_norm >= 0.99 * radius {
                            radius = (radius * 2.0).min(1e8);
                        }
                    }
                }

                let previous_cost = cost;
                x = x_new;
                r = r_new;
                cost = cost_new;
                accepted = true;

                if reduction <= options.ftol * previous_cost.max(f64::MIN_POSITIVE) {
                    termination = Some(TerminationReason::CostTolerance);
                } else if step_norm < options.xtol * (options.xtol + x.norm()) {
                    termination = Some(TerminationReason::StepTolerance);
                }
                break;
            }

            // Rejected proposal: tighten the step control and retry.
            match options.method {
                Method::LevenbergMarquardt => {
                    lambda *= 10.0;
                    if lambda > MAX_DAMPING {
                        termination = Some(TerminationReason::StepTolerance);
                        break;
                    }
                }
                _ => {
                    radius = 0.25 * step_norm.max(radius * 0.25);
                    if radius < MIN_TRUST_RADIUS {
                        termination = Some(TerminationReason::StepTolerance);
                        break;
                    }
                }
            }
        }

        tracing::debug!(
            iteration = iterations,
            cost,
            gradient_norm,
            radius,
            lambda,
            "least-squares iteration"
        );

        if !accepted && termination.is_none() {
            // Step attempts exhausted without improvement.
            termination = Some(TerminationReason::StepTolerance);
        }
    }

    let termination = termination.ok_or_else(|| {
        RegistrationError::convergence_failure(format!(
            "no tolerance met within {} iterations (cost {:.6e}, gradient {:.6e})",
            options.max_iterations, cost, gradient_norm
        ))
    })?;

    Ok(LeastSquaresFit {
        residual_norm: r.norm(),
        solution: x,
        cost,
        gradient_norm,
        iterations,
        evaluations,
        termination,
        elapsed: start.elapsed(),
    })
}

fn validate_options(options: &LeastSquaresOptions, n: usize) -> Result<()> {
    if options.max_iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "max_iterations must be positive",
        ));
    }
    if !(options.f_scale > 0.0) {
        return Err(RegistrationError::invalid_configuration(
            "f_scale must be positive",
        ));
    }
    if !(options.diff_step > 0.0) {
        return Err(RegistrationError::invalid_configuration(
            "diff_step must be positive",
        ));
    }
    if let Some((lower, upper)) = &options.bounds {
        if lower.len() != n || upper.len() != n {
            return Err(RegistrationError::ShapeMismatch {
                expected: vec![n],
                actual: vec![lower.len(), upper.len()],
            });
        }
        if lower.iter().zip(upper.iter()).any(|(l, u)| l > u) {
            return Err(RegistrationError::invalid_configuration(
                "lower bound exceeds upper bound",
            ));
        }
    }
    Ok(())
}

fn evaluate_checked<R: ResidualFunction>(residual: &R, x: &DVector<f64>) -> Result<DVector<f64>> {
    let r = residual.evaluate(x)?;
    if r.iter().any(|v| !v.is_finite()) {
        return Err(RegistrationError::convergence_failure(
            "residual contains non-finite values",
        ));
    }
    Ok(r)
}

fn clip_to_bounds(
    mut x: DVector<f64>,
    bounds: Option<&(DVector<f64>, DVector<f64>)>,
) -> DVector<f64> {
    if let Some((lower, upper)) = bounds {
        for i in 0..x.len() {
            x[i] = x[i].clamp(lower[i], upper[i]);
        }
    }
    x
}

fn loss_cost(r: &DVector<f64>, loss: Loss, f_scale: f64) -> f64 {
    let scale_sq = f_scale * f_scale;
    0.5 * scale_sq
        * r.iter()
            .map(|v| loss.rho((v / f_scale) * (v / f_scale)))
            .sum::<f64>()
}

/// Forward-difference Jacobian, stepping backwards at an upper bound so
/// probes stay feasible.
fn numeric_jacobian<R: ResidualFunction>(
    residual: &R,
    x: &DVector<f64>,
    r0: &DVector<f64>,
    options: &LeastSquaresOptions,
    evaluations: &mut usize,
) -> Result<DMatrix<f64>> {
    let m = r0.len();
    let n = x.len();
    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let h = options.diff_step * x[j].abs().max(1.0);
        let mut probe = x.clone();
        probe[j] = x[j] + h;
        if let Some((_, upper)) = &options.bounds {
            if probe[j] > upper[j] {
                probe[j] = x[j] - h;
            }
        }

        let rj = evaluate_checked(residual, &probe)?;
        *evaluations += 1;

        let denom = probe[j] - x[j];
        for i in 0..m {
            jac[(i, j)] = (rj[i] - r0[i]) / denom;
        }
    }

    Ok(jac)
}

/// Build `H = J~^T J~` and `g = J~^T r~` with rows reweighted by the loss.
fn weighted_normal_equations(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    loss: Loss,
    f_scale: f64,
) -> (DMatrix<f64>, DVector<f64>) {
    let m = jac.nrows();
    let n = jac.ncols();

    let mut h = DMatrix::zeros(n, n);
    let mut g = DVector::zeros(n);

    for i in 0..m {
        let z = (r[i] / f_scale) * (r[i] / f_scale);
        let w = loss.weight(z);
        let w_sq = w * w;
        let row = jac.row(i);

        for a in 0..n {
            g[a] += w_sq * row[a] * r[i];
            for b in a..n {
                h[(a, b)] += w_sq * row[a] * row[b];
            }
        }
    }
    // Mirror the upper triangle.
    for a in 0..n {
        for b in 0..a {
            h[(a, b)] = h[(b, a)];
        }
    }

    (h, g)
}

#[derive(Clone, Copy)]
enum StepNorm {
    Two,
    Inf,
}

impl StepNorm {
    fn apply(&self, v: &DVector<f64>) -> f64 {
        match self {
            StepNorm::Two => v.norm(),
            StepNorm::Inf => v.amax(),
        }
    }
}

/// Solve `(H + lambda * diag(H)) p = -g`.
fn damped_step(h: &DMatrix<f64>, g: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let n = h.nrows();
    let mut damped = h.clone();
    for i in 0..n {
        damped[(i, i)] += lambda * h[(i, i)].max(1e-12);
    }
    solve_spd(&damped, &(-g))
}

/// Gauss-Newton step with a tiny ridge fallback for rank-deficient systems.
fn gauss_newton_step(h: &DMatrix<f64>, g: &DVector<f64>) -> Option<DVector<f64>> {
    let neg_g = -g;
    if let Some(p) = solve_spd(h, &neg_g) {
        return Some(p);
    }
    let n = h.nrows();
    let mut ridged = h.clone();
    let scale = (0..n).map(|i| h[(i, i)]).fold(0.0_f64, f64::max).max(1.0);
    for i in 0..n {
        ridged[(i, i)] += 1e-10 * scale;
    }
    solve_spd(&ridged, &neg_g)
}

fn solve_spd(h: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let solution = h.clone().cholesky()?.solve(rhs);
    if solution.iter().all(|v| v.is_finite()) {
        Some(solution)
    } else {
        None
    }
}

/// Dogleg step: Gauss-Newton if it fits inside the trust region, otherwise
/// the Cauchy point continued towards the Gauss-Newton point until the
/// boundary is hit. The norm argument selects a spherical or rectangular
/// region.
fn dogleg_step(
    h: &DMatrix<f64>,
    g: &DVector<f64>,
    radius: f64,
    norm: StepNorm,
) -> Option<DVector<f64>> {
    let p_gn = gauss_newton_step(h, g)?;
    if norm.apply(&p_gn) <= radius {
        return Some(p_gn);
    }

    let g_norm_sq = g.dot(g);
    let ghg = g.dot(&(h * g));
    let p_sd = if ghg > 0.0 {
        g * (-g_norm_sq / ghg)
    } else {
        g * (-radius / norm.apply(g).max(f64::MIN_POSITIVE))
    };

    let sd_norm = norm.apply(&p_sd);
    if sd_norm >= radius {
        return Some(&p_sd * (radius / sd_norm));
    }

    let d = &p_gn - &p_sd;
    let tau = match norm {
        StepNorm::Two => {
            // ||p_sd + tau d||^2 = radius^2
            let a = d.dot(&d);
            let b = p_sd.dot(&d);
            let c = p_sd.dot(&p_sd) - radius * radius;
            let discriminant = (b * b - a * c).max(0.0);
            if a > 0.0 {
                (-b + discriminant.sqrt()) / a
            } else {
                0.0
            }
        }
        StepNorm::Inf => {
            // Largest tau keeping every component inside [-radius, radius].
            let mut tau = 1.0_f64;
            for i in 0..d.len() {
                if d[i] > 0.0 {
                    tau = tau.min((radius - p_sd[i]) / d[i]);
                } else if d[i] < 0.0 {
                    tau = tau.min((-radius - p_sd[i]) / d[i]);
                }
            }
            tau.max(0.0)
        }
    };

    Some(&p_sd + d * tau.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_problem(x: &DVector<f64>) -> Result<DVector<f64>> {
        // r = A x - b with minimum at (1, -2)
        Ok(DVector::from_vec(vec![
            2.0 * x[0] - 2.0,
            x[1] + 2.0,
            x[0] + x[1] + 1.0,
        ]))
    }

    #[test]
    fn test_each_method_solves_linear_problem() {
        for method in [
            Method::Dogbox,
            Method::TrustRegionReflective,
            Method::LevenbergMarquardt,
        ] {
            let options = LeastSquaresOptions {
                method,
                ..Default::default()
            };
            let fit = least_squares(&linear_problem, DVector::zeros(2), &options).unwrap();
            assert!(
                (fit.solution[0] - 1.0).abs() < 1e-6,
                "{method:?}: {:?}",
                fit.solution
            );
            assert!((fit.solution[1] + 2.0).abs() < 1e-6);
            assert!(fit.evaluations > 0);
        }
    }

    #[test]
    fn test_nonlinear_rosenbrock_residuals() {
        // Rosenbrock in residual form: minimum at (1, 1).
        let rosenbrock = |x: &DVector<f64>| -> Result<DVector<f64>> {
            Ok(DVector::from_vec(vec![
                10.0 * (x[1] - x[0] * x[0]),
                1.0 - x[0],
            ]))
        };
        let options = LeastSquaresOptions {
            max_iterations: 200,
            ..Default::default()
        };
        let fit = least_squares(&rosenbrock, DVector::from_vec(vec![-1.2, 1.0]), &options).unwrap();
        assert!((fit.solution[0] - 1.0).abs() < 1e-4, "{:?}", fit.solution);
        assert!((fit.solution[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bounds_are_respected() {
        let options = LeastSquaresOptions {
            bounds: Some((
                DVector::from_vec(vec![0.0, -1.0]),
                DVector::from_vec(vec![0.5, 0.0]),
            )),
            ..Default::default()
        };
        let fit = least_squares(&linear_problem, DVector::zeros(2), &options).unwrap();
        assert!(fit.solution[0] >= 0.0 && fit.solution[0] <= 0.5);
        assert!(fit.solution[1] >= -1.0 && fit.solution[1] <= 0.0);
        // The unconstrained minimum (1, -2) is outside the box, so the
        // solution sticks to the boundary.
        assert!((fit.solution[0] - 0.5).abs() < 1e-6);
        assert!((fit.solution[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_robust_loss_resists_outlier() {
        // One-parameter location fit with a gross outlier.
        let data = [0.9, 1.1, 1.0, 0.95, 1.05, 50.0];
        let residuals = move |x: &DVector<f64>| -> Result<DVector<f64>> {
            Ok(DVector::from_iterator(
                data.len(),
                data.iter().map(|d| x[0] - d),
            ))
        };

        let plain = least_squares(
            &residuals,
            DVector::zeros(1),
            &LeastSquaresOptions::default(),
        )
        .unwrap();
        let robust = least_squares(
            &residuals,
            DVector::zeros(1),
            &LeastSquaresOptions {
                loss: Loss::SoftL1,
                f_scale: 0.5,
                max_iterations: 500,
                ..Default::default()
            },
        )
        .unwrap();

        // The linear loss is dragged towards the outlier; soft L1 stays
        // near the inlier cluster.
        assert!(plain.solution[0] > 5.0);
        assert!(robust.solution[0] < 2.0);
    }

    #[test]
    fn test_empty_parameter_vector_returns_immediately() {
        let f = |_: &DVector<f64>| -> Result<DVector<f64>> { Ok(DVector::zeros(0)) };
        let fit = least_squares(&f, DVector::zeros(0), &LeastSquaresOptions::default()).unwrap();
        assert_eq!(fit.termination, TerminationReason::NoFreeParameters);
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.cost, 0.0);
    }

    #[test]
    fn test_non_finite_residual_is_fatal() {
        let f = |x: &DVector<f64>| -> Result<DVector<f64>> {
            Ok(DVector::from_vec(vec![(x[0] - 2.0).sqrt()]))
        };
        let result = least_squares(
            &f,
            DVector::from_vec(vec![0.0]),
            &LeastSquaresOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RegistrationError::ConvergenceFailure(_))
        ));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let options = LeastSquaresOptions {
            bounds: Some((DVector::from_vec(vec![1.0]), DVector::from_vec(vec![0.0]))),
            ..Default::default()
        };
        let f = |x: &DVector<f64>| -> Result<DVector<f64>> { Ok(x.clone()) };
        assert!(matches!(
            least_squares(&f, DVector::zeros(1), &options),
            Err(RegistrationError::InvalidConfiguration(_))
        ));
    }
}
