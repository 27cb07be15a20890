//! Gompertz regression with a deterministic retry.
//!
//! Given compressibility-curve points `(x_i = log10(stress_i), e_i)` we fit the
//! four Gompertz parameters by Levenberg–Marquardt from a fixed start. A fit whose
//! covariance is ill-conditioned (condition number above [`MAX_CONDITION`]) is
//! numerically unreliable even when the solver reports convergence, so we retry
//! once from a second fixed start. No other retries happen.

use tracing::{debug, warn};

use crate::error::PcError;
use crate::math::{levenberg_marquardt, LmOptions};
use crate::models::{gompertz, gompertz_gradient, GompertzParams};

/// Initial guesses, tried in order.
pub const INITIAL_GUESSES: [[f64; 4]; 2] = [[1.0, 1.0, 1.0, 1.0], [2.0, 2.0, 2.0, 2.0]];

/// Covariance condition number above which a fit is rejected.
pub const MAX_CONDITION: f64 = 1e10;

/// Accepted Gompertz fit.
#[derive(Debug, Clone)]
pub struct GompertzFit {
    pub params: GompertzParams,
    pub sse: f64,
    pub condition_number: f64,
    /// Which initial guess produced the fit (0 = first start, 1 = retry).
    pub attempt: usize,
}

/// Fit `e = g(x)` to the given points.
pub fn fit_gompertz(xs: &[f64], ys: &[f64]) -> Result<GompertzFit, PcError> {
    if xs.len() < GompertzParams::LEN {
        return Err(PcError::DataShape(format!(
            "Gompertz fit needs at least {} points, got {}",
            GompertzParams::LEN,
            xs.len()
        )));
    }

    let opts = LmOptions::default();
    let mut reasons = Vec::with_capacity(INITIAL_GUESSES.len());

    for (attempt, p0) in INITIAL_GUESSES.iter().enumerate() {
        match levenberg_marquardt(xs, ys, p0, gompertz, gompertz_gradient, &opts) {
            Ok(sol) => {
                let cond = sol.condition_number();
                if cond <= MAX_CONDITION {
                    debug!(
                        attempt,
                        sse = sol.sse,
                        cond,
                        evals = sol.evaluations,
                        termination = ?sol.termination,
                        "Gompertz fit accepted"
                    );
                    return Ok(GompertzFit {
                        params: GompertzParams::from_slice(&sol.params),
                        sse: sol.sse,
                        condition_number: cond,
                        attempt,
                    });
                }
                warn!(attempt, cond, "Gompertz fit ill-conditioned");
                reasons.push(format!("start {p0:?}: condition number {cond:.3e} > {MAX_CONDITION:e}"));
            }
            Err(err) => {
                warn!(attempt, %err, "Gompertz fit failed");
                reasons.push(format!("start {p0:?}: {err}"));
            }
        }
    }

    Err(PcError::FitConvergence(reasons.join("; ")))
}
