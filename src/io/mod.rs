//! Input/output helpers.
//!
//! - CSV ingest of consolidation tests (`ingest`)
//! - report and synthetic-test CSV exports (`export`)
//! - diagnostics JSON read/write (`diagnostics`)

pub mod diagnostics;
pub mod export;
pub mod ingest;

pub use diagnostics::*;
pub use export::*;
pub use ingest::*;
