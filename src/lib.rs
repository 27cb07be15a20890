//! `oedometer-pc` library crate.
//!
//! Determines the preconsolidation pressure of consolidation (oedometer) tests
//! with three methods: Casagrande, Oikawa and maximum curvature of a fitted
//! Gompertz curve.
//!
//! The binary (`oedpc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the determination core stays free of I/O and presentation

pub mod app;
pub mod cli;
pub mod curve;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod methods;
pub mod models;
pub mod plot;
pub mod report;
