//! Oikawa construction in `log10(1+e)`–`log10(σ)` space.
//!
//! The virgin compression line is the steepest tangent of the interpolated curve,
//! searched only before the first inflection. The recompression line is the
//! secant through the first two compressibility-curve points. No curvature search
//! is involved.

use tracing::debug;

use crate::curve::{first_inflection, search_end, CurveSamples, FittedCurve};
use crate::domain::{DiagnosticLine, Marker, MethodDiagnostics, MethodKind, MethodResult, YSpace};
use crate::error::PcError;
use crate::math::{argmin, Line};
use crate::methods::{finish, PreparedTest};

#[derive(Debug, Clone)]
pub struct OikawaConstruction {
    pub virgin: Line,
    pub recompression: Line,
    /// Grid index of the first inflection beyond the first unload.
    pub inflection: Option<usize>,
    pub pc: f64,
}

pub fn oikawa(prepared: &PreparedTest<'_>, grid_points: usize, render: bool) -> Result<MethodResult, PcError> {
    let y_space = YSpace::LogSpecificVolume;
    let curve = &prepared.curve;
    let fitted = FittedCurve::from_curve(curve, y_space)?;
    let samples = fitted.sample(curve, grid_points)?;

    let point = |i: usize| (curve.stress[i].log10(), y_space.transform(curve.void_ratio[i]));
    let recompression = Line::secant(point(0), point(1))?;
    let construction = oikawa_construction(&samples, recompression, prepared.first_unload_stress())?;
    let pc = construction.pc;
    debug!(
        test = %prepared.test.test_id,
        pc,
        virgin_slope = construction.virgin.slope,
        recompression_slope = recompression.slope,
        "Oikawa construction"
    );

    let diagnostics = render.then(|| {
        let stress_lo = samples.stress[0];
        let stress_hi = samples.stress[samples.len() - 1];

        let mut markers = vec![
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
        ];
        if let Some(i) = construction.inflection {
            markers.push(Marker {
                label: "inflection".to_string(),
                stress: samples.stress[i],
                y: Some(samples.value[i]),
            });
        }

        MethodDiagnostics {
            method: MethodKind::Oikawa,
            y_space,
            observed: prepared.observed(y_space),
            curvature: samples.curvature(),
            grid_stress: samples.stress.clone(),
            fitted: samples.value.clone(),
            d1: samples.d1.clone(),
            d2: samples.d2.clone(),
            inflection_stress: construction.inflection.map(|i| samples.stress[i]),
            lines: vec![
                DiagnosticLine {
                    label: "virgin".to_string(),
                    line: construction.virgin,
                    stress_min: (0.7 * pc).max(stress_lo),
                    stress_max: stress_hi,
                },
                DiagnosticLine {
                    label: "recompression".to_string(),
                    line: recompression,
                    stress_min: stress_lo,
                    stress_max: (1.3 * pc).min(stress_hi),
                },
            ],
            markers,
        }
    });

    finish(MethodKind::Oikawa, prepared.test.recorded_pc, pc, diagnostics)
}

/// Intersect the steepest pre-inflection tangent of `samples` with `recompression`.
pub fn oikawa_construction(
    samples: &CurveSamples,
    recompression: Line,
    first_unload_stress: f64,
) -> Result<OikawaConstruction, PcError> {
    let inflection = first_inflection(samples, first_unload_stress);
    let end = search_end(samples, inflection);
    if end == 0 {
        return Err(PcError::DataShape("no grid points before the first inflection".to_string()));
    }

    let i_vcl = argmin(&samples.d1[..end])
        .ok_or_else(|| PcError::NonFiniteValue("fitted slopes are not finite".to_string()))?;
    let virgin = Line::through(samples.log_stress[i_vcl], samples.value[i_vcl], samples.d1[i_vcl]);
    let pc = virgin.intersect_stress(&recompression)?;
    Ok(OikawaConstruction {
        virgin,
        recompression,
        inflection,
        pc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::fixtures::{synthetic_test, two_bend_samples, BEND_X, INFLECTION_X};

    #[test]
    fn synthetic_curve_estimate_lies_below_the_bend() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let result = oikawa(&prepared, 1000, false).unwrap();

        assert!(result.estimated_pc > 400.0 && result.estimated_pc < 500.0, "pc = {}", result.estimated_pc);
        let expected_err = (test.recorded_pc - result.estimated_pc) / result.estimated_pc * 100.0;
        assert!((result.percent_error - expected_err).abs() < 1e-9);
    }

    #[test]
    fn virgin_tangent_is_taken_before_the_first_inflection() {
        let samples = two_bend_samples(1001);
        // Horizontal through the vertex: meets the tangent at the inflection halfway
        // between the vertex and the inflection.
        let c = oikawa_construction(&samples, Line::horizontal(3.0), 10f64.powf(1.2)).unwrap();

        assert!((samples.log_stress[c.inflection.unwrap()] - INFLECTION_X).abs() < 5e-3);
        assert!((c.virgin.slope - (-0.8)).abs() < 0.01, "virgin slope {}", c.virgin.slope);
        let expected = 10f64.powf(0.5 * (BEND_X + INFLECTION_X));
        assert!((c.pc / expected - 1.0).abs() < 0.01, "pc = {} vs {expected}", c.pc);

        // The full grid holds a steeper tangent (-2.7 at 10^4 kPa) that is never used.
        assert!(samples.d1.iter().any(|&g| g < -2.5));
    }

    #[test]
    fn recompression_parallel_to_the_virgin_line_is_degenerate() {
        let samples = two_bend_samples(1001);
        let unload = 10f64.powf(1.2);
        let end = first_inflection(&samples, unload).unwrap();
        let parallel = Line::through(0.0, 10.0, samples.d1[end - 1]);
        let err = oikawa_construction(&samples, parallel, unload).unwrap_err();
        assert!(matches!(err, PcError::DegenerateGeometry(_)));
    }

    #[test]
    fn recompression_line_passes_through_the_first_two_points() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let result = oikawa(&prepared, 200, true).unwrap();
        let diag = result.diagnostics.expect("diagnostics requested");

        let recompression = diag.lines[1].line;
        for i in 0..2 {
            let s = prepared.curve.stress[i];
            let y = YSpace::LogSpecificVolume.transform(prepared.curve.void_ratio[i]);
            assert!((recompression.y_at_stress(s) - y).abs() < 1e-12);
        }
        assert!(diag.markers.iter().all(|m| m.label != "mcp"));
        assert_eq!(diag.d1.len(), 200);
    }
}
