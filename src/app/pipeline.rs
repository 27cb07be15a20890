//! Shared batch pipeline used by the CLI front-end and the tests.
//!
//! Per test: validate -> select compressibility curve -> three methods (in
//! parallel) -> error aggregation. Tests are evaluated in parallel and in
//! isolation; a failing test is recorded, never propagated.

use tracing::{debug, info, warn};

use crate::domain::{AnalysisConfig, ConsolidationTest, MethodKind, MethodOutcome, ReportRow};
use crate::error::AppError;
use crate::methods::{run_method, PreparedTest};
use crate::report::{aggregate_row, BatchReport};
use rayon::prelude::*;

/// Evaluate one test. Never fails: errors end up in the row's outcomes.
pub fn evaluate_test(test: &ConsolidationTest, config: &AnalysisConfig) -> ReportRow {
    evaluate(test, config).0
}

/// Returns the row and whether the shared preparation step failed.
fn evaluate(test: &ConsolidationTest, config: &AnalysisConfig) -> (ReportRow, bool) {
    let tolerance = config.error_tolerance_percent;

    let prepared = match PreparedTest::prepare(test) {
        Ok(p) => p,
        Err(err) => {
            warn!(id = test.id, test = %test.test_id, %err, "test rejected before any method ran");
            let outcome = |m: MethodKind| {
                if config.is_enabled(m) {
                    MethodOutcome::Failed(err.clone())
                } else {
                    MethodOutcome::Disabled
                }
            };
            let row = aggregate_row(
                test.id,
                &test.test_id,
                outcome(MethodKind::Casagrande),
                outcome(MethodKind::Oikawa),
                outcome(MethodKind::MaxCurvature),
                tolerance,
            );
            return (row, true);
        }
    };

    let run = |m: MethodKind| {
        if !config.is_enabled(m) {
            return MethodOutcome::Disabled;
        }
        let outcome =
            MethodOutcome::from_result(run_method(m, &prepared, config.grid_points, config.render_diagnostics));
        if let MethodOutcome::Failed(err) = &outcome {
            warn!(id = test.id, test = %test.test_id, method = m.display_name(), %err, "method failed");
        }
        outcome
    };

    let (casagrande, (oikawa, max_curvature)) = rayon::join(
        || run(MethodKind::Casagrande),
        || rayon::join(|| run(MethodKind::Oikawa), || run(MethodKind::MaxCurvature)),
    );

    let row = aggregate_row(test.id, &test.test_id, casagrande, oikawa, max_curvature, tolerance);
    debug!(
        id = row.id,
        test = %row.test_id,
        avg = ?row.average_error,
        exceeds = row.exceeds_tolerance,
        "test evaluated"
    );
    (row, false)
}

/// Evaluate every test and assemble the batch report.
pub fn run_batch(tests: &[ConsolidationTest], config: &AnalysisConfig) -> Result<BatchReport, AppError> {
    config.validate()?;
    if tests.is_empty() {
        return Err(AppError::new(3, "No consolidation tests to evaluate."));
    }

    info!(tests = tests.len(), grid = config.grid_points, "evaluating batch");
    let evaluated: Vec<(ReportRow, bool)> = tests.par_iter().map(|t| evaluate(t, config)).collect();

    let selection_failures: Vec<usize> = evaluated.iter().filter(|(_, failed)| *failed).map(|(r, _)| r.id).collect();
    let rows = evaluated.into_iter().map(|(r, _)| r).collect();
    let report = BatchReport::from_rows(rows, &selection_failures);

    info!(
        tests = report.rows.len(),
        exceeded = report.exceeded_count(),
        failures = report.failures.len(),
        "batch complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_tests, SimulationConfig};
    use crate::domain::Increment;
    use crate::error::PcError;
    use crate::methods::fixtures::synthetic_test;

    #[test]
    fn evaluates_all_three_methods() {
        let test = synthetic_test();
        let row = evaluate_test(&test, &AnalysisConfig::default());

        for m in MethodKind::ALL {
            assert!(row.outcome(m).result().is_some(), "{} failed: {:?}", m.display_name(), row.outcome(m));
        }
        let mean = MethodKind::ALL
            .iter()
            .map(|&m| row.outcome(m).percent_error().unwrap())
            .sum::<f64>()
            / 3.0;
        assert!((row.average_error.unwrap() - mean).abs() < 1e-9);
    }

    #[test]
    fn disabled_methods_are_not_computed() {
        let config = AnalysisConfig {
            enable_oikawa: false,
            enable_max_curvature: false,
            ..AnalysisConfig::default()
        };
        let row = evaluate_test(&synthetic_test(), &config);
        assert!(row.casagrande.result().is_some());
        assert!(!row.oikawa.is_enabled());
        assert!(!row.max_curvature.is_enabled());
        assert_eq!(row.average_error, row.casagrande.percent_error());
    }

    #[test]
    fn one_bad_test_does_not_abort_the_batch() {
        let mut good = synthetic_test();
        good.id = 0;
        let bad = ConsolidationTest {
            id: 1,
            test_id: "MONO".to_string(),
            increments: vec![
                Increment::new(10.0, 1.0),
                Increment::new(20.0, 0.95),
                Increment::new(40.0, 0.90),
            ],
            recorded_pc: 20.0,
        };

        let report = run_batch(&[bad, good], &AnalysisConfig::default()).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].id, 0);
        assert!(report.rows[0].average_error.is_some());

        assert!(report.critical.contains(&"1_MONO".to_string()));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, "selection");
        assert_eq!(report.rows[1].casagrande.error(), Some(&PcError::DataShape(
            "no unload/reload cycle found (stress never decreases after a peak)".to_string()
        )));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let err = run_batch(&[], &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn simulated_batch_runs_end_to_end() {
        let sim = SimulationConfig {
            count: 6,
            seed: 7,
            noise: 0.0,
        };
        let tests = generate_tests(&sim).unwrap();
        let config = AnalysisConfig {
            render_diagnostics: true,
            ..AnalysisConfig::default()
        };
        let report = run_batch(&tests, &config).unwrap();

        assert_eq!(report.rows.len(), 6);
        assert!(report.failures.is_empty());
        for row in &report.rows {
            let mc = row.max_curvature.result().expect("noise-free Gompertz data fits");
            assert!(mc.diagnostics.is_some());
            // The recorded value is the Gompertz maximum-curvature stress itself.
            assert!(mc.percent_error.abs() < 5.0, "{}: {}", row.label(), mc.percent_error);

            // The spline constructions land on either side of the bend, within a factor of two.
            let ca = row.casagrande.result().unwrap();
            let oi = row.oikawa.result().unwrap();
            assert!(ca.percent_error < 0.0 && ca.percent_error > -60.0, "{}: CA {}", row.label(), ca.percent_error);
            assert!(oi.percent_error > 0.0 && oi.percent_error < 100.0, "{}: OI {}", row.label(), oi.percent_error);
            assert!(!row.exceeds_tolerance, "{}: avg {:?}", row.label(), row.average_error);
        }
        assert!(report.critical.is_empty(), "{:?}", report.critical);
    }
}
