//! Read/write diagnostics JSON files.
//!
//! A diagnostics file is the portable form of the rendered constructions: one
//! bundle per test holding the geometry of every method that produced one. It
//! can be re-plotted later without recomputing.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{MethodDiagnostics, MethodKind};
use crate::error::AppError;
use crate::report::BatchReport;

/// Diagnostics of one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDiagnostics {
    pub id: usize,
    pub test_id: String,
    pub recorded_pc: Option<f64>,
    pub methods: Vec<MethodDiagnostics>,
}

/// Collect the bundles of every test that has at least one.
pub fn collect_diagnostics(report: &BatchReport, recorded_pc: impl Fn(usize) -> Option<f64>) -> Vec<TestDiagnostics> {
    report
        .rows
        .iter()
        .filter_map(|row| {
            let methods: Vec<MethodDiagnostics> = MethodKind::ALL
                .iter()
                .filter_map(|&m| row.outcome(m).result()?.diagnostics.clone())
                .collect();
            if methods.is_empty() {
                return None;
            }
            Some(TestDiagnostics {
                id: row.id,
                test_id: row.test_id.clone(),
                recorded_pc: recorded_pc(row.id),
                methods,
            })
        })
        .collect()
}

pub fn write_diagnostics_json(path: &Path, bundles: &[TestDiagnostics]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create diagnostics JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, bundles)
        .map_err(|e| AppError::new(2, format!("Failed to write diagnostics JSON: {e}")))?;
    Ok(())
}

pub fn read_diagnostics_json(path: &Path) -> Result<Vec<TestDiagnostics>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open diagnostics JSON '{}': {e}", path.display())))?;
    let bundles: Vec<TestDiagnostics> =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid diagnostics JSON: {e}")))?;
    Ok(bundles)
}
