//! Command-line parsing for the preconsolidation-pressure tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the determination code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "oedpc", version, about = "Preconsolidation pressure from consolidation tests")]
pub struct Cli {
    /// Verbose logging (debug level). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Determine pc for every test in a CSV, print the report, and optionally plot/export.
    Analyze(AnalyzeArgs),
    /// Write synthetic consolidation tests in the input CSV format.
    Simulate(SimulateArgs),
    /// Plot a previously exported diagnostics JSON.
    Plot(PlotArgs),
}

/// Options for a batch analysis.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Input CSV (test_id, stress, void_ratio, recorded_pc; one row per increment).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Average percent error above which a test is flagged (0 to 300).
    #[arg(short = 't', long, default_value_t = 50.0)]
    pub tolerance: f64,

    /// Skip the Casagrande method.
    #[arg(long)]
    pub no_casagrande: bool,

    /// Skip the Oikawa method.
    #[arg(long)]
    pub no_oikawa: bool,

    /// Skip the maximum-curvature (Gompertz) method.
    #[arg(long)]
    pub no_max_curvature: bool,

    /// Produce diagnostic geometry (needed for plots and `--diagnostics`).
    #[arg(long)]
    pub render: bool,

    /// Points on the dense log-stress evaluation grid.
    #[arg(long, default_value_t = 1000)]
    pub grid_points: usize,

    /// Export the report to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export diagnostic geometry to JSON (requires `--render`).
    #[arg(long, requires = "render")]
    pub diagnostics: Option<PathBuf>,

    /// Write SVG figures into this directory (implies `--render`).
    #[arg(long, value_name = "DIR")]
    pub plots: Option<PathBuf>,

    /// Add a panel with the slope, second derivative and curvature of the fitted
    /// curve (and the first inflection) below each SVG construction.
    #[arg(long, requires = "plots")]
    pub troubleshoot: bool,

    /// Render ASCII plots of each construction in the terminal (implies `--render`).
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

/// Options for synthetic test generation.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output CSV.
    #[arg(value_name = "CSV")]
    pub output: PathBuf,

    /// Number of tests to generate.
    #[arg(short = 'n', long, default_value_t = 10)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the void-ratio noise.
    #[arg(long, default_value_t = 0.0002)]
    pub noise: f64,
}

/// Options for plotting saved diagnostics.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Diagnostics JSON file produced by `oedpc analyze --render --diagnostics`.
    #[arg(value_name = "JSON")]
    pub diagnostics: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "oedpc", "analyze", "tests.csv", "-t", "15", "--no-oikawa", "--render", "--diagnostics", "d.json",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.input, PathBuf::from("tests.csv"));
        assert_eq!(args.tolerance, 15.0);
        assert!(args.no_oikawa && !args.no_casagrande);
        assert_eq!(args.grid_points, 1000);
        assert_eq!(args.diagnostics, Some(PathBuf::from("d.json")));
    }

    #[test]
    fn diagnostics_export_requires_render() {
        let res = Cli::try_parse_from(["oedpc", "analyze", "tests.csv", "--diagnostics", "d.json"]);
        assert!(res.is_err());
    }

    #[test]
    fn troubleshoot_requires_plots() {
        assert!(Cli::try_parse_from(["oedpc", "analyze", "tests.csv", "--troubleshoot"]).is_err());
        let cli = Cli::try_parse_from(["oedpc", "analyze", "tests.csv", "--plots", "figs", "--troubleshoot"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert!(args.troubleshoot);
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["oedpc", "simulate", "out.csv", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
