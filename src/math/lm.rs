//! Levenberg–Marquardt nonlinear least squares.
//!
//! We solve small unweighted problems of the form:
//!
//! ```text
//! minimize Σ (y_i - f(x_i; p))^2
//! ```
//!
//! for a handful of parameters `p` (the Gompertz model has four).
//!
//! Implementation choices:
//! - Marquardt scaling: the damping term is `λ · diag(JᵀJ)` so the step is
//!   invariant to the units of each parameter.
//! - Multiplicative λ updates (÷10 on an accepted step, ×10 on a rejected one).
//! - Convergence on relative SSE reduction (`ftol`), relative step size (`xtol`)
//!   or a vanishing gradient (`gtol`); failure when the evaluation budget is
//!   exhausted or the objective stops being finite.
//! - When λ passes its ceiling no downhill step is left. The current point is
//!   returned as [`Termination::Stalled`] so callers can tell it apart from a
//!   tolerance-based stop.
//! - The solution keeps `JᵀJ` at the optimum. Its 2-norm condition number is the
//!   condition number of the parameter covariance (a scaled inverse of it), which
//!   callers use to judge whether the fit is trustworthy.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::PcError;

/// λ beyond which no downhill step is representable; the fit has stalled at a minimum.
const LAMBDA_MAX: f64 = 1e16;
const LAMBDA_MIN: f64 = 1e-12;
/// Floor for the Marquardt diagonal so zero-sensitivity parameters still get damped.
const DIAG_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_evals: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub lambda0: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_evals: 5000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-12,
            lambda0: 1e-3,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative SSE reduction within `ftol` or relative step within `xtol`.
    Tolerance,
    /// Gradient within `gtol`.
    Gradient,
    /// λ passed its ceiling without an accepted step.
    Stalled,
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    pub sse: f64,
    /// `JᵀJ` evaluated at `params`.
    pub jtj: DMatrix<f64>,
    pub evaluations: usize,
    pub termination: Termination,
}

impl LmSolution {
    /// 2-norm condition number of `JᵀJ`; infinite when singular.
    pub fn condition_number(&self) -> f64 {
        condition_number(&self.jtj)
    }
}

/// Ratio of the largest to the smallest singular value.
pub fn condition_number(m: &DMatrix<f64>) -> f64 {
    let sv = m.clone().svd(false, false).singular_values;
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min.is_finite() && max.is_finite()) || min <= 0.0 {
        return f64::INFINITY;
    }
    max / min
}

/// Fit `model` to `(xs, ys)` starting from `p0`.
///
/// `gradient(x, p, out)` must fill `out` with `∂f/∂p_j` at `x`.
pub fn levenberg_marquardt<F, G>(
    xs: &[f64],
    ys: &[f64],
    p0: &[f64],
    model: F,
    gradient: G,
    opts: &LmOptions,
) -> Result<LmSolution, PcError>
where
    F: Fn(f64, &[f64]) -> f64,
    G: Fn(f64, &[f64], &mut [f64]),
{
    let n = xs.len();
    let k = p0.len();
    if ys.len() != n {
        return Err(PcError::DataShape(format!(
            "regression inputs differ in length ({n} vs {})",
            ys.len()
        )));
    }
    if n < k {
        return Err(PcError::DataShape(format!(
            "{n} observation(s) cannot determine {k} parameters"
        )));
    }

    let sse_at = |p: &[f64]| -> f64 {
        xs.iter()
            .zip(ys.iter())
            .map(|(&x, &y)| {
                let r = y - model(x, p);
                r * r
            })
            .sum()
    };

    let mut p = DVector::from_column_slice(p0);
    let mut sse = sse_at(p.as_slice());
    let mut evals = 1usize;
    if !sse.is_finite() {
        return Err(PcError::FitConvergence(
            "objective is not finite at the initial guess".to_string(),
        ));
    }
    let mut lambda = opts.lambda0;

    loop {
        let (jac, r) = jacobian_and_residuals(xs, ys, p.as_slice(), &model, &gradient);
        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let g = &jt * &r;

        if g.amax() <= opts.gtol {
            return Ok(LmSolution {
                params: p.iter().copied().collect(),
                sse,
                jtj,
                evaluations: evals,
                termination: Termination::Gradient,
            });
        }

        loop {
            if evals >= opts.max_evals {
                return Err(PcError::FitConvergence(format!(
                    "no convergence within {} function evaluations",
                    opts.max_evals
                )));
            }
            if lambda > LAMBDA_MAX {
                debug!(sse, evals, gradient = g.amax(), "Levenberg-Marquardt stalled without a downhill step");
                return Ok(LmSolution {
                    params: p.iter().copied().collect(),
                    sse,
                    jtj,
                    evaluations: evals,
                    termination: Termination::Stalled,
                });
            }

            let mut damped = jtj.clone();
            for j in 0..k {
                damped[(j, j)] += lambda * jtj[(j, j)].max(DIAG_FLOOR);
            }
            let delta = match damped.clone().cholesky() {
                Some(chol) => Some(chol.solve(&g)),
                None => damped.lu().solve(&g),
            };
            let Some(delta) = delta else {
                lambda *= 10.0;
                continue;
            };

            let p_new = &p + &delta;
            if p_new.iter().any(|v| !v.is_finite()) {
                lambda *= 10.0;
                continue;
            }

            let sse_new = sse_at(p_new.as_slice());
            evals += 1;

            if sse_new.is_finite() && sse_new < sse {
                let rel_reduction = (sse - sse_new) / sse.max(f64::MIN_POSITIVE);
                let small_step = delta.norm() <= opts.xtol * (p.norm() + opts.xtol);
                p = p_new;
                sse = sse_new;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);

                if rel_reduction <= opts.ftol || small_step {
                    let (jac, _) = jacobian_and_residuals(xs, ys, p.as_slice(), &model, &gradient);
                    let jtj = jac.transpose() * &jac;
                    return Ok(LmSolution {
                        params: p.iter().copied().collect(),
                        sse,
                        jtj,
                        evaluations: evals,
                        termination: Termination::Tolerance,
                    });
                }
                break;
            }
            lambda *= 10.0;
        }
    }
}

fn jacobian_and_residuals<F, G>(
    xs: &[f64],
    ys: &[f64],
    p: &[f64],
    model: &F,
    gradient: &G,
) -> (DMatrix<f64>, DVector<f64>)
where
    F: Fn(f64, &[f64]) -> f64,
    G: Fn(f64, &[f64], &mut [f64]),
{
    let n = xs.len();
    let k = p.len();
    let mut jac = DMatrix::<f64>::zeros(n, k);
    let mut r = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; k];
    for i in 0..n {
        gradient(xs[i], p, &mut row);
        for j in 0..k {
            jac[(i, j)] = row[j];
        }
        r[i] = ys[i] - model(xs[i], p);
    }
    (jac, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_an_exponential_decay() {
        // y = 2 * exp(-0.7 x)
        let xs: Vec<f64> = (0..15).map(|i| i as f64 * 0.3).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 2.0 * (-0.7 * x).exp()).collect();

        let model = |x: f64, p: &[f64]| p[0] * (-p[1] * x).exp();
        let grad = |x: f64, p: &[f64], out: &mut [f64]| {
            let e = (-p[1] * x).exp();
            out[0] = e;
            out[1] = -p[0] * x * e;
        };

        let sol = levenberg_marquardt(&xs, &ys, &[1.0, 1.0], model, grad, &LmOptions::default()).unwrap();
        assert!((sol.params[0] - 2.0).abs() < 1e-6, "{:?}", sol.params);
        assert!((sol.params[1] - 0.7).abs() < 1e-6, "{:?}", sol.params);
        assert!(sol.sse < 1e-10);
        assert!(sol.condition_number().is_finite());
        assert_ne!(sol.termination, Termination::Stalled);
    }

    #[test]
    fn no_downhill_direction_is_reported_as_a_stall() {
        // The gradient has the wrong sign, so every proposed step climbs.
        let model = |_x: f64, p: &[f64]| p[0];
        let grad = |_x: f64, _p: &[f64], out: &mut [f64]| out[0] = -1.0;
        let sol = levenberg_marquardt(&[0.0, 1.0, 2.0], &[1.0, 1.0, 1.0], &[0.0], model, grad, &LmOptions::default())
            .unwrap();
        assert_eq!(sol.termination, Termination::Stalled);
        assert_eq!(sol.params, vec![0.0]);
        assert!((sol.sse - 3.0).abs() < 1e-12);
    }

    #[test]
    fn too_few_observations_is_a_shape_error() {
        let model = |x: f64, p: &[f64]| p[0] + p[1] * x;
        let grad = |x: f64, _p: &[f64], out: &mut [f64]| {
            out[0] = 1.0;
            out[1] = x;
        };
        let err = levenberg_marquardt(&[1.0], &[2.0], &[0.0, 0.0], model, grad, &LmOptions::default())
            .unwrap_err();
        assert!(matches!(err, PcError::DataShape(_)));
    }

    #[test]
    fn singular_matrix_has_infinite_condition() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(condition_number(&m) > 1e10);
        let eye = DMatrix::<f64>::identity(3, 3);
        assert!((condition_number(&eye) - 1.0).abs() < 1e-12);
    }
}
