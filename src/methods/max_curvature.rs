//! Maximum-curvature method on a fitted Gompertz curve.
//!
//! `pc` is the grid stress where `|g''| / (1 + g'^2)^{3/2}` peaks. The derivatives
//! are analytic; no inflection truncation applies here.

use tracing::debug;

use crate::curve::CurveSamples;
use crate::domain::{Marker, MethodDiagnostics, MethodKind, MethodResult, YSpace};
use crate::error::PcError;
use crate::fit::fit_gompertz;
use crate::math::{argmax, log_space};
use crate::methods::{finish, PreparedTest};

pub fn max_curvature(prepared: &PreparedTest<'_>, grid_points: usize, render: bool) -> Result<MethodResult, PcError> {
    let curve = &prepared.curve;
    let xs: Vec<f64> = curve.stress.iter().map(|s| s.log10()).collect();
    let fit = fit_gompertz(&xs, &curve.void_ratio)?;
    let params = fit.params;

    let stress = log_space(curve.stress_min(), curve.stress_max(), grid_points)?;
    let samples = CurveSamples::from_fn(stress, |x| {
        (params.value(x), params.first_derivative(x), params.second_derivative(x))
    });
    let curvature = samples.curvature();
    let i_mcp = argmax(&curvature)
        .ok_or_else(|| PcError::NonFiniteValue("Gompertz curvature is not finite".to_string()))?;
    let pc = samples.stress[i_mcp];

    debug!(
        test = %prepared.test.test_id,
        pc,
        a = params.a,
        b = params.b,
        c = params.c,
        m = params.m,
        attempt = fit.attempt,
        "maximum curvature"
    );

    let diagnostics = render.then(|| MethodDiagnostics {
        method: MethodKind::MaxCurvature,
        y_space: YSpace::VoidRatio,
        observed: prepared.observed(YSpace::VoidRatio),
        grid_stress: samples.stress.clone(),
        fitted: samples.value.clone(),
        d1: samples.d1.clone(),
        d2: samples.d2.clone(),
        curvature: curvature.clone(),
        inflection_stress: None,
        lines: Vec::new(),
        markers: vec![
            Marker {
                label: "mcp".to_string(),
                stress: pc,
                y: Some(samples.value[i_mcp]),
            },
            Marker {
                label: "calculated_pc".to_string(),
                stress: pc,
                y: None,
            },
            Marker {
                label: "recorded_pc".to_string(),
                stress: prepared.test.recorded_pc,
                y: None,
            },
        ],
    });

    finish(MethodKind::MaxCurvature, prepared.test.recorded_pc, pc, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::fixtures::synthetic_test;

    #[test]
    fn estimate_is_a_grid_stress_within_the_curve() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let result = max_curvature(&prepared, 1000, true).unwrap();

        let pc = result.estimated_pc;
        assert!(pc >= prepared.curve.stress_min() && pc <= prepared.curve.stress_max());
        let diag = result.diagnostics.expect("diagnostics requested");
        assert!(diag.grid_stress.iter().any(|&s| s == pc));
        assert!(diag.lines.is_empty());

        // No grid point bends more sharply than the reported one.
        let i = diag.grid_stress.iter().position(|&s| s == pc).unwrap();
        let peak = diag.curvature[i];
        assert!(diag.curvature.iter().all(|&k| k <= peak));
    }

    #[test]
    fn too_few_points_is_a_data_shape_error() {
        use crate::domain::{ConsolidationTest, Increment};
        let test = ConsolidationTest {
            id: 0,
            test_id: "SHORT".to_string(),
            increments: vec![
                Increment::new(10.0, 1.00),
                Increment::new(20.0, 0.95),
                Increment::new(10.0, 0.96),
                Increment::new(40.0, 0.85),
            ],
            recorded_pc: 20.0,
        };
        let prepared = PreparedTest::prepare(&test).unwrap();
        assert_eq!(prepared.curve.len(), 3);
        let err = max_curvature(&prepared, 100, false).unwrap_err();
        assert!(matches!(err, PcError::DataShape(_)));
    }
}
