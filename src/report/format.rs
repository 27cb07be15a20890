//! Formatted terminal output for a batch run.
//!
//! Formatting lives here so the determination code stays free of presentation
//! concerns and output changes stay local.

use chrono::{DateTime, Local};

use crate::domain::{AnalysisConfig, MethodKind, MethodOutcome, ReportRow};
use crate::report::BatchReport;

/// Header, per-test table, critical list and failures.
pub fn format_run_summary(report: &BatchReport, config: &AnalysisConfig, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();

    out.push_str("=== oedpc - Preconsolidation Pressure ===\n");
    out.push_str(&format!("Run: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Error tolerance: {}%\n", config.error_tolerance_percent));
    let enabled: Vec<&str> = MethodKind::ALL
        .iter()
        .filter(|&&m| config.is_enabled(m))
        .map(|m| m.display_name())
        .collect();
    out.push_str(&format!("Methods: {}\n", enabled.join(", ")));
    out.push_str(&format!(
        "Tests: n={} | failures={}\n",
        report.rows.len(),
        report.failures.len()
    ));
    out.push('\n');

    out.push_str(&format_table(&report.rows));
    out.push('\n');
    out.push_str(&format_critical(report, config.error_tolerance_percent));

    if !report.failures.is_empty() {
        out.push_str("\nFailures:\n");
        for f in &report.failures {
            out.push_str(&format!(
                "- {}_{} [{}] {}: {}\n",
                f.id, f.test_id, f.stage, f.kind, f.message
            ));
        }
    }

    out
}

/// "N test(s) exceeded ..." followed by their labels.
pub fn format_critical(report: &BatchReport, tolerance_percent: f64) -> String {
    let mut out = format!(
        "{} test(s) exceeded the error threshold of {}%\n",
        report.exceeded_count(),
        tolerance_percent
    );
    for label in &report.critical {
        out.push_str(&format!("  {label}\n"));
    }
    out
}

fn format_table(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<5} {:<16} {:>10} {:>9} {:>10} {:>9} {:>10} {:>9} {:>9} {:<6}",
            "ID", "TEST_ID", "PC_CA", "ERR_CA", "PC_OI", "ERR_OI", "PC_MC", "ERR_MC", "AVG_ERR", "EXCEED"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<5} {:-<16} {:-<10} {:-<9} {:-<10} {:-<9} {:-<10} {:-<9} {:-<9} {:-<6}",
            "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let mut line = format!("{:<5} {:<16}", r.id, truncate(&r.test_id, 16));
        for method in MethodKind::ALL {
            let (pc, err) = method_cells(r.outcome(method));
            line.push_str(&format!(" {pc:>10} {err:>9}"));
        }
        let avg = r.average_error.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
        line.push_str(&format!(" {avg:>9} {:<6}", if r.exceeds_tolerance { "yes" } else { "no" }));
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn method_cells(outcome: &MethodOutcome) -> (String, String) {
    match outcome {
        MethodOutcome::Computed(r) => (format!("{:.2}", r.estimated_pc), format!("{:.2}", r.percent_error)),
        MethodOutcome::Failed(_) => ("fail".to_string(), "-".to_string()),
        MethodOutcome::Disabled => (String::new(), String::new()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MethodResult;
    use crate::error::PcError;
    use crate::report::aggregate_row;
    use chrono::TimeZone;

    fn computed(pc: f64, err: f64) -> MethodOutcome {
        MethodOutcome::Computed(MethodResult {
            estimated_pc: pc,
            percent_error: err,
            diagnostics: None,
        })
    }

    #[test]
    fn summary_mentions_threshold_and_failures() {
        let rows = vec![
            aggregate_row(0, "SITE-A", computed(120.0, 5.0), computed(110.0, 4.0), computed(100.0, 3.0), 25.0),
            aggregate_row(
                1,
                "SITE-B",
                computed(120.0, 5.0),
                MethodOutcome::Failed(PcError::DegenerateGeometry("parallel".to_string())),
                MethodOutcome::Disabled,
                25.0,
            ),
        ];
        let report = BatchReport::from_rows(rows, &[]);
        let config = AnalysisConfig {
            error_tolerance_percent: 25.0,
            ..AnalysisConfig::default()
        };
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let text = format_run_summary(&report, &config, at);

        assert!(text.contains("Run: 2024-03-01 09:30:00"));
        assert!(text.contains("1 test(s) exceeded the error threshold of 25%"));
        assert!(text.contains("  1_SITE-B"));
        assert!(text.contains("[Oikawa] degenerate_geometry"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn truncate_long_ids() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }
}
