//! CSV ingest of consolidation tests.
//!
//! The input is long format, one row per load increment, in chronological order
//! within each test:
//!
//! ```text
//! test_id,stress,void_ratio,recorded_pc
//! B-12,12.5,1.102,150
//! B-12,25,1.098,
//! ...
//! ```
//!
//! Headers are case-insensitive; the lab workbook names `TEST_ID`, `CONS_INCF`,
//! `CONS_INCE` and `CONG_PRCP` are accepted as aliases. Rows are grouped by test
//! in order of first appearance and the recorded pressure is the first non-empty
//! value of the group.
//!
//! Numeric cells that are empty or unparseable become NaN rather than row
//! errors, so the determination core rejects that one test with a
//! non-finite-value error and the rest of the batch is unaffected.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;

use crate::domain::{ConsolidationTest, Increment};
use crate::error::AppError;

/// Canonical column name and its accepted aliases.
const COLUMNS: [(&str, &[&str]); 4] = [
    ("test_id", &["test_id"]),
    ("stress", &["stress", "cons_incf"]),
    ("void_ratio", &["void_ratio", "cons_ince"]),
    ("recorded_pc", &["recorded_pc", "cong_prcp"]),
];

/// A row-level problem encountered during ingest. The row is skipped.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: grouped tests plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedTests {
    pub tests: Vec<ConsolidationTest>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load tests from a CSV file.
pub fn load_tests(path: &Path) -> Result<IngestedTests, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    load_tests_from_reader(file)
}

/// Load tests from any CSV source.
pub fn load_tests_from_reader<R: Read>(source: R) -> Result<IngestedTests, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&headers)?;

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<Increment>, Option<f64>)> = HashMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(test_id) = cell(&record, columns.test_id) else {
            row_errors.push(RowError {
                line,
                message: "Missing test_id".to_string(),
            });
            continue;
        };

        let stress = parse_or_nan(cell(&record, columns.stress));
        let void_ratio = parse_or_nan(cell(&record, columns.void_ratio));
        let recorded = cell(&record, columns.recorded_pc);

        let group = groups.entry(test_id.to_string()).or_insert_with(|| {
            order.push(test_id.to_string());
            (Vec::new(), None)
        });
        group.0.push(Increment::new(stress, void_ratio));
        if group.1.is_none() && recorded.is_some() {
            group.1 = Some(parse_or_nan(recorded));
        }
    }

    let tests = order
        .into_iter()
        .enumerate()
        .filter_map(|(id, test_id)| {
            let (increments, recorded) = groups.remove(&test_id)?;
            Some(ConsolidationTest {
                id,
                test_id,
                increments,
                recorded_pc: recorded.unwrap_or(f64::NAN),
            })
        })
        .collect();

    Ok(IngestedTests {
        tests,
        row_errors,
        rows_read,
    })
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    test_id: usize,
    stress: usize,
    void_ratio: usize,
    recorded_pc: usize,
}

fn resolve_columns(headers: &StringRecord) -> Result<Columns, AppError> {
    let header_map = build_header_map(headers);
    let mut found = [0usize; 4];
    let mut missing = Vec::new();
    for (slot, (canonical, aliases)) in COLUMNS.iter().enumerate() {
        match aliases.iter().find_map(|a| header_map.get(*a)) {
            Some(&idx) => found[slot] = idx,
            None => missing.push(*canonical),
        }
    }
    if !missing.is_empty() {
        return Err(AppError::new(
            2,
            format!("Missing required column(s): {}", missing.join(", ")),
        ));
    }
    Ok(Columns {
        test_id: found[0],
        stress: found[1],
        void_ratio: found[2],
        recorded_pc: found[3],
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_or_nan(s: Option<&str>) -> f64 {
    s.and_then(|v| v.parse::<f64>().ok()).unwrap_or(f64::NAN)
}
