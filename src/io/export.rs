//! CSV exports: the batch report and synthetic test files.
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{ConsolidationTest, MethodKind, ReportRow};
use crate::error::AppError;
use crate::report::BatchReport;

/// Report columns, in order.
pub const REPORT_HEADER: [&str; 10] = [
    "ID",
    "TEST_ID",
    "PC_CA",
    "ERR_CA",
    "PC_OI",
    "ERR_OI",
    "PC_MC",
    "ERR_MC",
    "AVG_ERR",
    "EXCEED_ERR_TOL",
];

/// Write the batch report to a CSV file.
pub fn write_report_csv(path: &Path, report: &BatchReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_report(file, report)
}

/// Write the batch report as CSV to any sink. Failed or disabled cells are empty.
pub fn write_report<W: Write>(sink: W, report: &BatchReport) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(REPORT_HEADER)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;
    for row in &report.rows {
        writer
            .write_record(report_record(row))
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn report_record(row: &ReportRow) -> Vec<String> {
    let num = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();
    let mut rec = vec![row.id.to_string(), row.test_id.clone()];
    for method in MethodKind::ALL {
        let outcome = row.outcome(method);
        rec.push(num(outcome.estimated_pc()));
        rec.push(num(outcome.percent_error()));
    }
    rec.push(num(row.average_error));
    rec.push(row.exceeds_tolerance.to_string());
    rec
}

/// Write tests in the long ingest format (recorded pressure on each test's first row).
pub fn write_tests_csv(path: &Path, tests: &[ConsolidationTest]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create tests CSV '{}': {e}", path.display())))?;
    write_tests(file, tests)
}

pub fn write_tests<W: Write>(sink: W, tests: &[ConsolidationTest]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    let write_err = |e: csv::Error| AppError::new(2, format!("Failed to write tests CSV: {e}"));

    writer
        .write_record(["test_id", "stress", "void_ratio", "recorded_pc"])
        .map_err(write_err)?;
    for test in tests {
        for (i, inc) in test.increments.iter().enumerate() {
            let recorded = if i == 0 { format!("{:.4}", test.recorded_pc) } else { String::new() };
            writer
                .write_record([
                    test.test_id.clone(),
                    format!("{}", inc.stress),
                    format!("{:.6}", inc.void_ratio),
                    recorded,
                ])
                .map_err(write_err)?;
        }
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush tests CSV: {e}")))?;
    Ok(())
}
