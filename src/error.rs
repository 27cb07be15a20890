//! Error types.
//!
//! Two layers:
//!
//! - [`PcError`]: failures of the determination core for a single test. These are
//!   recorded against the test in the batch report and never abort a run.
//! - [`AppError`]: failures of the application shell (CLI, configuration, I/O),
//!   carrying the process exit code.

use thiserror::Error;

/// Failure while determining the preconsolidation pressure of one test.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PcError {
    /// Too few points, or no load-unload-reload cycle to separate the regimes.
    #[error("data shape: {0}")]
    DataShape(String),
    /// Missing or non-numeric stress, void ratio or recorded pressure.
    #[error("non-finite value: {0}")]
    NonFiniteValue(String),
    /// The Gompertz regression did not converge after the retry.
    #[error("fit convergence: {0}")]
    FitConvergence(String),
    /// Two intersected lines are parallel (or the intersection is not finite).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

impl PcError {
    /// Stable short label used in reports and exports.
    pub fn kind(&self) -> &'static str {
        match self {
            PcError::DataShape(_) => "data_shape",
            PcError::NonFiniteValue(_) => "non_finite_value",
            PcError::FitConvergence(_) => "fit_convergence",
            PcError::DegenerateGeometry(_) => "degenerate_geometry",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<PcError> for AppError {
    fn from(err: PcError) -> Self {
        AppError::new(4, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable_labels() {
        assert_eq!(PcError::DataShape("x".into()).kind(), "data_shape");
        assert_eq!(PcError::NonFiniteValue("x".into()).kind(), "non_finite_value");
        assert_eq!(PcError::FitConvergence("x".into()).kind(), "fit_convergence");
        assert_eq!(PcError::DegenerateGeometry("x".into()).kind(), "degenerate_geometry");
    }

    #[test]
    fn core_errors_map_to_exit_code_4() {
        let app: AppError = PcError::DegenerateGeometry("parallel".into()).into();
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("parallel"));
    }
}
