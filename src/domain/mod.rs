//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - test inputs (`Increment`, `ConsolidationTest`)
//! - the loading-path subsequence (`CompressibilityCurve`)
//! - per-method outputs (`MethodResult`, `MethodDiagnostics`) and report rows
//! - the analysis configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
