//! Synthetic consolidation tests for demos and end-to-end runs.
//!
//! Each test follows a Gompertz compressibility curve in `e`–`log10(σ)` space
//! with a doubling load schedule from 10 kPa, one unload–reload loop early on the
//! recompression branch, and a terminal unload. The recorded pressure is the
//! curve's maximum-curvature stress, optionally perturbed.
//!
//! The Gompertz centre `m` sits above the last load (5120 kPa). The loaded range
//! then spans the recompression bend and the virgin branch; the sharper bend
//! where the sigmoid flattens out again (past `m`) stays outside it.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{ConsolidationTest, Increment};
use crate::error::AppError;
use crate::math::{argmax, curvature, log_space};
use crate::models::GompertzParams;

/// First load step (kPa).
const FIRST_STRESS: f64 = 10.0;
/// Number of doubling load steps.
const LOAD_STEPS: usize = 10;
/// Load step after which the first unload starts.
const LOOP_ONSET: usize = 2;
/// Swelling slope on unload/reload per log cycle of stress.
const SWELLING_INDEX: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub count: usize,
    pub seed: u64,
    /// Standard deviation of the void-ratio noise; also the relative
    /// perturbation of the recorded pressure.
    pub noise: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            count: 10,
            seed: 42,
            noise: 0.0002,
        }
    }
}

pub fn generate_tests(config: &SimulationConfig) -> Result<Vec<ConsolidationTest>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Test count must be > 0."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Noise must be a non-negative number."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut tests = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let params = GompertzParams {
            a: rng.gen_range(0.3..0.5),
            b: rng.gen_range(1.2..1.6),
            c: rng.gen_range(0.6..0.9),
            m: rng.gen_range(3.5..3.8),
        };

        let mut increments = schedule(&params);
        for inc in &mut increments {
            inc.void_ratio += config.noise * normal.sample(&mut rng);
        }

        let stress_max = FIRST_STRESS * 2f64.powi(LOAD_STEPS as i32 - 1);
        let pc = max_curvature_stress(&params, FIRST_STRESS, stress_max)?;
        let recorded_pc = pc * (1.0 + config.noise * normal.sample(&mut rng)).max(0.1);

        tests.push(ConsolidationTest {
            id: i,
            test_id: format!("SIM-{:03}", i + 1),
            increments,
            recorded_pc,
        });
    }

    Ok(tests)
}

/// Noise-free increments in chronological order.
fn schedule(params: &GompertzParams) -> Vec<Increment> {
    let e = |s: f64| params.value(s.log10());
    let swell = |from: f64, to: f64, e_from: f64| e_from + SWELLING_INDEX * (from / to).log10();

    let loads: Vec<f64> = (0..LOAD_STEPS).map(|k| FIRST_STRESS * 2f64.powi(k as i32)).collect();
    let mut out = Vec::with_capacity(LOAD_STEPS + 8);

    for (k, &s) in loads.iter().enumerate() {
        out.push(Increment::new(s, e(s)));
        if k == LOOP_ONSET {
            let e_onset = e(s);
            for t in [s / 2.0, s / 4.0, s / 2.0, s] {
                out.push(Increment::new(t, swell(s, t, e_onset)));
            }
        }
    }

    let s_end = loads[LOAD_STEPS - 1];
    let e_end = e(s_end);
    for t in [s_end / 4.0, s_end / 16.0, s_end / 64.0] {
        out.push(Increment::new(t, swell(s_end, t, e_end)));
    }
    out
}

/// Stress of maximum Gompertz curvature on a fine log grid.
fn max_curvature_stress(params: &GompertzParams, lo: f64, hi: f64) -> Result<f64, AppError> {
    let grid = log_space(lo, hi, 1000)?;
    let k: Vec<f64> = grid
        .iter()
        .map(|s| {
            let x = s.log10();
            curvature(params.first_derivative(x), params.second_derivative(x))
        })
        .collect();
    let i = argmax(&k).ok_or_else(|| AppError::new(4, "Synthetic curve has no finite curvature."))?;
    Ok(grid[i])
}
