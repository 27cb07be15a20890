//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initialises logging
//! - loads consolidation tests
//! - runs the batch pipeline
//! - prints the report and plots
//! - writes optional exports

use std::io;
use std::path::Path;

use chrono::Local;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Command, PlotArgs, SimulateArgs};
use crate::data::SimulationConfig;
use crate::domain::{AnalysisConfig, ConsolidationTest, MethodKind};
use crate::error::AppError;
use crate::report::BatchReport;

pub mod pipeline;

/// Entry point for the `oedpc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    config.validate()?;

    let ingested = crate::io::load_tests(&args.input)?;
    for e in &ingested.row_errors {
        warn!(line = e.line, "skipped row: {}", e.message);
    }
    info!(
        rows = ingested.rows_read,
        tests = ingested.tests.len(),
        path = %args.input.display(),
        "loaded tests"
    );
    let tests = ingested.tests;

    let report = pipeline::run_batch(&tests, &config)?;
    println!("{}", crate::report::format_run_summary(&report, &config, Local::now()));

    if args.plot {
        print_ascii_plots(&report, args.width, args.height);
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_report_csv(path, &report)?;
        info!(path = %path.display(), "report exported");
    }
    if let Some(path) = &args.diagnostics {
        let bundles = crate::io::collect_diagnostics(&report, |id| recorded_pc(&tests, id));
        crate::io::write_diagnostics_json(path, &bundles)?;
        info!(path = %path.display(), tests = bundles.len(), "diagnostics exported");
    }
    if let Some(dir) = &args.plots {
        write_svg_plots(dir, &tests, &report, args.troubleshoot)?;
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let sim = SimulationConfig {
        count: args.count,
        seed: args.seed,
        noise: args.noise,
    };
    let tests = crate::data::generate_tests(&sim)?;
    crate::io::write_tests_csv(&args.output, &tests)?;
    info!(tests = tests.len(), path = %args.output.display(), "synthetic tests written");
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let bundles = crate::io::read_diagnostics_json(&args.diagnostics)?;
    for bundle in &bundles {
        for diag in &bundle.methods {
            let title = format!("{}_{} {} Method", bundle.id, bundle.test_id, diag.method.display_name());
            println!("{}", crate::plot::render_ascii_plot(diag, &title, args.width, args.height));
        }
    }
    Ok(())
}

pub fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    AnalysisConfig {
        error_tolerance_percent: args.tolerance,
        enable_casagrande: !args.no_casagrande,
        enable_oikawa: !args.no_oikawa,
        enable_max_curvature: !args.no_max_curvature,
        render_diagnostics: args.render || args.plot || args.plots.is_some(),
        grid_points: args.grid_points,
    }
}

fn recorded_pc(tests: &[ConsolidationTest], id: usize) -> Option<f64> {
    tests.iter().find(|t| t.id == id).map(|t| t.recorded_pc)
}

fn print_ascii_plots(report: &BatchReport, width: usize, height: usize) {
    for row in &report.rows {
        for method in MethodKind::ALL {
            let Some(diag) = row.outcome(method).result().and_then(|r| r.diagnostics.as_ref()) else {
                continue;
            };
            let title = format!("{} {} Method", row.label(), method.display_name());
            println!("{}", crate::plot::render_ascii_plot(diag, &title, width, height));
        }
    }
}

/// One figure per computed method plus the raw curve, per test. With
/// `troubleshoot` each method figure gets the derivative panel.
///
/// Rendering problems are logged and skipped; only a missing output directory
/// is an error.
fn write_svg_plots(
    dir: &Path,
    tests: &[ConsolidationTest],
    report: &BatchReport,
    troubleshoot: bool,
) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create plot dir '{}': {e}", dir.display())))?;

    let mut written = 0usize;
    for row in &report.rows {
        let label = row.label();
        if let Some(test) = tests.iter().find(|t| t.id == row.id) {
            match crate::plot::write_raw_svg(&dir.join(format!("{label} plot.svg")), test) {
                Ok(()) => written += 1,
                Err(err) => warn!(test = %label, %err, "raw plot failed"),
            }
        }
        for method in MethodKind::ALL {
            let Some(diag) = row.outcome(method).result().and_then(|r| r.diagnostics.as_ref()) else {
                continue;
            };
            let title = format!("{label} {} Method", method.display_name());
            match crate::plot::write_method_svg(&dir.join(format!("{title}.svg")), diag, &title, troubleshoot) {
                Ok(()) => written += 1,
                Err(err) => warn!(test = %label, method = method.display_name(), %err, "method plot failed"),
            }
        }
    }
    info!(dir = %dir.display(), figures = written, "plots written");
    Ok(())
}
