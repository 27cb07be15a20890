//! Reporting: per-test error aggregation and the batch report.
//!
//! Formatting for the terminal lives in [`format`]; this module only combines
//! method outcomes into report rows and collects the lists a batch run surfaces.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{MethodKind, MethodOutcome, ReportRow};
use crate::error::PcError;

/// Mean percent error of the enabled methods.
///
/// `None` when no method is enabled or an enabled method failed: a missing
/// estimate leaves the average undefined rather than being skipped.
pub fn average_error(outcomes: &[&MethodOutcome]) -> Option<f64> {
    let enabled: Vec<&MethodOutcome> = outcomes.iter().copied().filter(|o| o.is_enabled()).collect();
    if enabled.is_empty() {
        return None;
    }
    let mut sum = 0.0;
    for outcome in &enabled {
        let err = outcome.percent_error()?;
        if !err.is_finite() {
            return None;
        }
        sum += err;
    }
    Some(sum / enabled.len() as f64)
}

/// `|avg| > tolerance`, with an undefined average always exceeding.
pub fn exceeds_tolerance(average_error: Option<f64>, tolerance_percent: f64) -> bool {
    match average_error {
        Some(avg) => avg.abs() > tolerance_percent,
        None => true,
    }
}

/// Combine the three method outcomes of one test into its report row.
pub fn aggregate_row(
    id: usize,
    test_id: &str,
    casagrande: MethodOutcome,
    oikawa: MethodOutcome,
    max_curvature: MethodOutcome,
    tolerance_percent: f64,
) -> ReportRow {
    let average = average_error(&[&casagrande, &oikawa, &max_curvature]);
    ReportRow {
        id,
        test_id: test_id.to_string(),
        casagrande,
        oikawa,
        max_curvature,
        average_error: average,
        exceeds_tolerance: exceeds_tolerance(average, tolerance_percent),
    }
}

/// A per-test failure, recorded instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub id: usize,
    pub test_id: String,
    /// `"selection"` when the shared loading-path step failed, else the method name.
    pub stage: String,
    pub kind: String,
    pub message: String,
}

impl FailureRecord {
    pub fn new(id: usize, test_id: &str, stage: &str, err: &PcError) -> Self {
        Self {
            id,
            test_id: test_id.to_string(),
            stage: stage.to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a whole batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One row per test, ordered by `ID`.
    pub rows: Vec<ReportRow>,
    /// `"{ID}_{TEST_ID}"` of every test exceeding the tolerance, ordered by `ID`.
    pub critical: Vec<String>,
    pub failures: Vec<FailureRecord>,
}

impl BatchReport {
    /// Build the report from rows in any order.
    ///
    /// `selection_failures` lists the IDs whose shared preparation failed; their
    /// method failures are reported once under the `"selection"` stage.
    pub fn from_rows(mut rows: Vec<ReportRow>, selection_failures: &[usize]) -> Self {
        rows.sort_by_key(|r| r.id);

        let critical = rows.iter().filter(|r| r.exceeds_tolerance).map(ReportRow::label).collect();

        let mut failures = Vec::new();
        for row in &rows {
            if selection_failures.contains(&row.id) {
                let first = MethodKind::ALL.iter().find_map(|&m| row.outcome(m).error());
                if let Some(err) = first {
                    failures.push(FailureRecord::new(row.id, &row.test_id, "selection", err));
                }
                continue;
            }
            for method in MethodKind::ALL {
                if let Some(err) = row.outcome(method).error() {
                    failures.push(FailureRecord::new(row.id, &row.test_id, method.display_name(), err));
                }
            }
        }

        Self {
            rows,
            critical,
            failures,
        }
    }

    pub fn exceeded_count(&self) -> usize {
        self.critical.len()
    }
}
