//! Casagrande construction in `e`–`log10(σ)` space.
//!
//! 1. Interpolate the compressibility curve and sample it densely.
//! 2. Stop the searches at the first inflection beyond the first unload.
//! 3. L1 (virgin compression line): tangent at the most negative slope.
//! 4. Maximum-curvature point (mcp) within the same range.
//! 5. L2 (bisector): through the mcp with half the curve slope there.
//! 6. `pc` is the stress where L1 and L2 meet.

use tracing::debug;

use crate::curve::{first_inflection, search_end, CurveSamples, FittedCurve};
use crate::domain::{DiagnosticLine, Marker, MethodDiagnostics, MethodKind, MethodResult, YSpace};
use crate::error::PcError;
use crate::math::{argmax, argmin, Line};
use crate::methods::{finish, PreparedTest};

/// Intermediate construction, kept for diagnostics and tests.
#[derive(Debug, Clone)]
pub struct CasagrandeConstruction {
    pub virgin: Line,
    pub bisector: Line,
    pub tangent_mcp: Line,
    /// `(stress, e)` of the maximum-curvature point.
    pub mcp: (f64, f64),
    /// Grid index of the first inflection beyond the first unload.
    pub inflection: Option<usize>,
    pub pc: f64,
}

pub fn casagrande(prepared: &PreparedTest<'_>, grid_points: usize, render: bool) -> Result<MethodResult, PcError> {
    let fitted = FittedCurve::from_curve(&prepared.curve, YSpace::VoidRatio)?;
    let samples = fitted.sample(&prepared.curve, grid_points)?;
    let construction = casagrande_construction(&samples, prepared.first_unload_stress())?;
    let pc = construction.pc;
    let inflection_stress = construction.inflection.map(|i| samples.stress[i]);
    debug!(
        test = %prepared.test.test_id,
        pc,
        mcp = construction.mcp.0,
        inflection = ?inflection_stress,
        "Casagrande construction"
    );

    let diagnostics = render.then(|| {
        let stress_lo = samples.stress[0];
        let stress_hi = samples.stress[samples.len() - 1];
        let (s_mcp, y_mcp) = construction.mcp;
        let near = |label: &str, line: Line| DiagnosticLine {
            label: label.to_string(),
            line,
            stress_min: s_mcp,
            stress_max: (1.3 * pc).min(stress_hi),
        };

        let mut markers = vec![
            Marker {
                label: "mcp".to_string(),
                stress: s_mcp,
                y: Some(y_mcp),
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
        ];
        if let Some(i) = construction.inflection {
            markers.push(Marker {
                label: "inflection".to_string(),
                stress: samples.stress[i],
                y: Some(samples.value[i]),
            });
        }

        MethodDiagnostics {
            method: MethodKind::Casagrande,
            y_space: YSpace::VoidRatio,
            observed: prepared.observed(YSpace::VoidRatio),
            curvature: samples.curvature(),
            grid_stress: samples.stress.clone(),
            fitted: samples.value.clone(),
            d1: samples.d1.clone(),
            d2: samples.d2.clone(),
            inflection_stress,
            lines: vec![
                DiagnosticLine {
                    label: "virgin".to_string(),
                    line: construction.virgin,
                    stress_min: (0.7 * pc).max(stress_lo),
                    stress_max: stress_hi,
                },
                near("bisector", construction.bisector),
                near("tangent_mcp", construction.tangent_mcp),
                near("horizontal_mcp", Line::horizontal(y_mcp)),
            ],
            markers,
        }
    });

    finish(MethodKind::Casagrande, prepared.test.recorded_pc, pc, diagnostics)
}

/// Build the construction on a sampled `e`–`log10(σ)` curve.
///
/// Both the steepest-slope and the curvature search stop before the first
/// inflection beyond `first_unload_stress`.
pub fn casagrande_construction(
    samples: &CurveSamples,
    first_unload_stress: f64,
) -> Result<CasagrandeConstruction, PcError> {
    let inflection = first_inflection(samples, first_unload_stress);
    let end = search_end(samples, inflection);
    if end == 0 {
        return Err(PcError::DataShape("no grid points before the first inflection".to_string()));
    }

    let i_vcl = argmin(&samples.d1[..end])
        .ok_or_else(|| PcError::NonFiniteValue("fitted slopes are not finite".to_string()))?;
    let virgin = Line::through(samples.log_stress[i_vcl], samples.value[i_vcl], samples.d1[i_vcl]);

    let curvature = samples.curvature();
    let i_mcp = argmax(&curvature[..end])
        .ok_or_else(|| PcError::NonFiniteValue("fitted curvature is not finite".to_string()))?;
    let (x_mcp, y_mcp) = (samples.log_stress[i_mcp], samples.value[i_mcp]);
    let slope_mcp = samples.d1[i_mcp];
    let bisector = Line::through(x_mcp, y_mcp, 0.5 * slope_mcp);
    let tangent_mcp = Line::through(x_mcp, y_mcp, slope_mcp);

    let pc = virgin.intersect_stress(&bisector)?;
    Ok(CasagrandeConstruction {
        virgin,
        bisector,
        tangent_mcp,
        mcp: (samples.stress[i_mcp], y_mcp),
        inflection,
        pc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConsolidationTest, Increment};
    use crate::methods::fixtures::{synthetic_test, two_bend_samples, BEND_X, INFLECTION_X};

    #[test]
    fn synthetic_curve_estimate_lies_past_the_bend() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let result = casagrande(&prepared, 1000, false).unwrap();

        assert!(result.estimated_pc > 900.0 && result.estimated_pc < 1200.0, "pc = {}", result.estimated_pc);
        let expected_err = (test.recorded_pc - result.estimated_pc) / result.estimated_pc * 100.0;
        assert!((result.percent_error - expected_err).abs() < 1e-9);
        assert!(result.diagnostics.is_none());
    }

    #[test]
    fn parabolic_curve_matches_the_closed_form() {
        // e = 1.2 - (x - 1.5)^2 / 4: the spline reproduces it exactly, the mcp is the
        // vertex (bisector horizontal) and the steepest tangent is at the last load,
        // so the two lines meet halfway between them in log-stress.
        let e = |s: f64| 1.2 - 0.25 * (s.log10() - 1.5).powi(2);
        let stress = [10.0, 20.0, 40.0, 80.0, 40.0, 20.0, 160.0, 320.0, 640.0, 1280.0];
        let increments = stress
            .iter()
            .enumerate()
            .map(|(i, &s)| Increment::new(s, if i == 4 || i == 5 { e(80.0) + 0.01 } else { e(s) }))
            .collect();
        let test = ConsolidationTest {
            id: 0,
            test_id: "PARABOLA".to_string(),
            increments,
            recorded_pc: 200.0,
        };
        let prepared = PreparedTest::prepare(&test).unwrap();
        assert_eq!(prepared.curve.len(), 8);

        let result = casagrande(&prepared, 1000, true).unwrap();
        let expected = 10f64.powf(0.5 * (1.5 + 1280f64.log10()));
        assert!((result.estimated_pc / expected - 1.0).abs() < 5e-3, "pc = {} vs {expected}", result.estimated_pc);

        let diag = result.diagnostics.unwrap();
        assert_eq!(diag.inflection_stress, None);
        let mcp = diag.markers.iter().find(|m| m.label == "mcp").unwrap();
        assert!((mcp.stress.log10() - 1.5).abs() < 2e-3);
        assert!((diag.lines[0].line.slope - (-0.5 * (1280f64.log10() - 1.5))).abs() < 1e-6);
    }

    #[test]
    fn searches_stop_at_the_first_inflection() {
        let samples = two_bend_samples(1001);
        let c = casagrande_construction(&samples, 10f64.powf(1.2)).unwrap();

        let i = c.inflection.expect("inflection at 10^2.3 kPa");
        assert!((samples.log_stress[i] - INFLECTION_X).abs() < 5e-3);
        // Past the inflection the curve gets steeper and bends harder than anywhere before it.
        let steepest = samples.d1.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(steepest < -2.5);
        let sharpest = samples.curvature().into_iter().fold(0.0, f64::max);
        assert!(sharpest > 1.5);

        assert!((c.virgin.slope - (-0.8)).abs() < 0.01, "virgin slope {}", c.virgin.slope);
        assert!((c.mcp.0.log10() - BEND_X).abs() < 5e-3);
        assert!(c.bisector.slope.abs() < 5e-3);
        let expected = 10f64.powf(0.5 * (BEND_X + INFLECTION_X));
        assert!((c.pc / expected - 1.0).abs() < 0.01, "pc = {} vs {expected}", c.pc);
    }

    #[test]
    fn inflection_scan_starts_past_the_first_unload() {
        let samples = two_bend_samples(1001);
        // An unload beyond 10^2.3 kPa skips the first sign change and stops the
        // searches at the second one (10^2.8 kPa) instead.
        let c = casagrande_construction(&samples, 1.0).unwrap();
        assert!((samples.log_stress[c.inflection.unwrap()] - INFLECTION_X).abs() < 5e-3);
        let later = casagrande_construction(&samples, 10f64.powf(2.5)).unwrap();
        assert!(samples.log_stress[later.inflection.unwrap()] > 2.79);
    }

    #[test]
    fn diagnostics_describe_the_construction() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let result = casagrande(&prepared, 500, true).unwrap();
        let diag = result.diagnostics.expect("diagnostics requested");

        assert_eq!(diag.method, MethodKind::Casagrande);
        assert_eq!(diag.grid_stress.len(), 500);
        assert_eq!(diag.fitted.len(), 500);
        assert_eq!(diag.d1.len(), 500);
        assert_eq!(diag.d2.len(), 500);
        assert_eq!(diag.observed.len(), test.increments.len());
        let labels: Vec<&str> = diag.lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["virgin", "bisector", "tangent_mcp", "horizontal_mcp"]);

        // The two construction lines meet at the reported pressure.
        let virgin = diag.lines[0].line;
        let bisector = diag.lines[1].line;
        let x = result.estimated_pc.log10();
        assert!((virgin.y_at(x) - bisector.y_at(x)).abs() < 1e-9);
        // The bisector halves the tangent slope at the mcp.
        assert!((bisector.slope - 0.5 * diag.lines[2].line.slope).abs() < 1e-12);
    }

    #[test]
    fn rendering_does_not_change_the_estimate() {
        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let plain = casagrande(&prepared, 1000, false).unwrap();
        let rendered = casagrande(&prepared, 1000, true).unwrap();
        assert_eq!(plain.estimated_pc, rendered.estimated_pc);
    }
}
