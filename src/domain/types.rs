//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the determination
//! - exported to JSON/CSV
//! - handed to the plotting layer as plain geometry

use serde::{Deserialize, Serialize};

use crate::error::{AppError, PcError};
use crate::math::Line;

/// Minimum number of increments in a consolidation test.
pub const MIN_INCREMENTS: usize = 3;

/// One load increment: stress at the end of the increment and the void ratio reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Increment {
    /// Effective vertical stress (kPa).
    pub stress: f64,
    pub void_ratio: f64,
}

impl Increment {
    pub fn new(stress: f64, void_ratio: f64) -> Self {
        Self { stress, void_ratio }
    }
}

/// A single oedometer test as supplied by the batch driver.
///
/// Increments are in chronological order, not sorted by stress: unloading shows up
/// as a stress decrease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationTest {
    /// Sequential row number within the batch (`ID` column).
    pub id: usize,
    /// Identifier of the test (`TEST_ID` column).
    pub test_id: String,
    pub increments: Vec<Increment>,
    /// Preconsolidation pressure recorded by the laboratory (kPa).
    pub recorded_pc: f64,
}

impl ConsolidationTest {
    /// Check the preconditions shared by all methods.
    ///
    /// The unload-cycle requirement is checked by the curve selector, which is
    /// where the unload onsets are located.
    pub fn validate(&self) -> Result<(), PcError> {
        if self.increments.len() < MIN_INCREMENTS {
            return Err(PcError::DataShape(format!(
                "test has {} increment(s), at least {MIN_INCREMENTS} required",
                self.increments.len()
            )));
        }
        if !self.recorded_pc.is_finite() {
            return Err(PcError::NonFiniteValue(
                "recorded preconsolidation pressure is missing or not numeric".to_string(),
            ));
        }
        if self.recorded_pc <= 0.0 {
            return Err(PcError::DataShape(format!(
                "recorded preconsolidation pressure must be > 0, got {}",
                self.recorded_pc
            )));
        }
        for (i, inc) in self.increments.iter().enumerate() {
            if !inc.stress.is_finite() {
                return Err(PcError::NonFiniteValue(format!(
                    "stress at increment {i} is missing or not numeric"
                )));
            }
            if !inc.void_ratio.is_finite() {
                return Err(PcError::NonFiniteValue(format!(
                    "void ratio at increment {i} is missing or not numeric"
                )));
            }
            if inc.stress <= 0.0 || inc.void_ratio <= 0.0 {
                return Err(PcError::DataShape(format!(
                    "increment {i} must have positive stress and void ratio, got ({}, {})",
                    inc.stress, inc.void_ratio
                )));
            }
        }
        Ok(())
    }

    /// Label used in plot titles and the critical list, e.g. `3_BH1-S2`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.id, self.test_id)
    }
}

/// Loading-path subsequence of a test, with unload/reload loops removed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressibilityCurve {
    /// Indices (into the test's increments) that were kept.
    pub retained: Vec<usize>,
    pub stress: Vec<f64>,
    pub void_ratio: Vec<f64>,
}

impl CompressibilityCurve {
    pub fn len(&self) -> usize {
        self.stress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stress.is_empty()
    }

    pub fn stress_min(&self) -> f64 {
        self.stress.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn stress_max(&self) -> f64 {
        self.stress.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Ordinate used when fitting the compressibility curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YSpace {
    /// `y = e`.
    VoidRatio,
    /// `y = log10(1 + e)`.
    LogSpecificVolume,
}

impl YSpace {
    pub fn transform(self, void_ratio: f64) -> f64 {
        match self {
            YSpace::VoidRatio => void_ratio,
            YSpace::LogSpecificVolume => (1.0 + void_ratio).log10(),
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            YSpace::VoidRatio => "Void Ratio, e [-]",
            YSpace::LogSpecificVolume => "Log (1 + Void Ratio, e) [-]",
        }
    }
}

/// Determination method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Casagrande,
    Oikawa,
    MaxCurvature,
}

impl MethodKind {
    pub const ALL: [MethodKind; 3] = [MethodKind::Casagrande, MethodKind::Oikawa, MethodKind::MaxCurvature];

    /// Human-readable label for terminal output and plot titles.
    pub fn display_name(self) -> &'static str {
        match self {
            MethodKind::Casagrande => "Casagrande",
            MethodKind::Oikawa => "Oikawa",
            MethodKind::MaxCurvature => "Maximum Curvature",
        }
    }

    /// Column suffix in the report (`PC_CA`, `ERR_CA`, ...).
    pub fn column_code(self) -> &'static str {
        match self {
            MethodKind::Casagrande => "CA",
            MethodKind::Oikawa => "OI",
            MethodKind::MaxCurvature => "MC",
        }
    }
}

/// A line drawn on a diagnostic figure, with the stress window it is drawn over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticLine {
    pub label: String,
    pub line: Line,
    pub stress_min: f64,
    pub stress_max: f64,
}

/// A highlighted point or vertical marker (`y = None`) on a diagnostic figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub stress: f64,
    pub y: Option<f64>,
}

/// Geometry produced alongside a result when rendering is requested.
///
/// Purely informational: nothing in the numeric result depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDiagnostics {
    pub method: MethodKind,
    pub y_space: YSpace,
    /// Every increment of the test (including unload/reload) in `(stress, y)`.
    pub observed: Vec<(f64, f64)>,
    pub grid_stress: Vec<f64>,
    pub fitted: Vec<f64>,
    /// `dy/dx` and `d²y/dx²` on the grid, `x = log10(stress)`.
    #[serde(default)]
    pub d1: Vec<f64>,
    #[serde(default)]
    pub d2: Vec<f64>,
    pub curvature: Vec<f64>,
    pub inflection_stress: Option<f64>,
    pub lines: Vec<DiagnosticLine>,
    pub markers: Vec<Marker>,
}

impl MethodDiagnostics {
    fn marker_stress(&self, label: &str) -> Option<f64> {
        self.markers.iter().find(|m| m.label == label).map(|m| m.stress)
    }

    /// Percent difference of the recorded pressure from the calculated one, read
    /// off the two pressure markers.
    pub fn percent_difference(&self) -> Option<f64> {
        let calculated = self.marker_stress("calculated_pc")?;
        let recorded = self.marker_stress("recorded_pc")?;
        let diff = crate::methods::percent_error(recorded, calculated);
        diff.is_finite().then_some(diff)
    }
}

/// Output of one determination method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub estimated_pc: f64,
    pub percent_error: f64,
    pub diagnostics: Option<MethodDiagnostics>,
}

/// What happened to one method for one test.
#[derive(Debug, Clone)]
pub enum MethodOutcome {
    Disabled,
    Computed(MethodResult),
    Failed(PcError),
}

impl MethodOutcome {
    pub fn from_result(result: Result<MethodResult, PcError>) -> Self {
        match result {
            Ok(r) => MethodOutcome::Computed(r),
            Err(e) => MethodOutcome::Failed(e),
        }
    }

    pub fn result(&self) -> Option<&MethodResult> {
        match self {
            MethodOutcome::Computed(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PcError> {
        match self {
            MethodOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, MethodOutcome::Disabled)
    }

    pub fn estimated_pc(&self) -> Option<f64> {
        self.result().map(|r| r.estimated_pc)
    }

    pub fn percent_error(&self) -> Option<f64> {
        self.result().map(|r| r.percent_error)
    }
}

/// One row of the batch report, keyed by the test identifier.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: usize,
    pub test_id: String,
    pub casagrande: MethodOutcome,
    pub oikawa: MethodOutcome,
    pub max_curvature: MethodOutcome,
    /// Mean percent error of the enabled methods; `None` when undefined.
    pub average_error: Option<f64>,
    pub exceeds_tolerance: bool,
}

impl ReportRow {
    pub fn outcome(&self, method: MethodKind) -> &MethodOutcome {
        match method {
            MethodKind::Casagrande => &self.casagrande,
            MethodKind::Oikawa => &self.oikawa,
            MethodKind::MaxCurvature => &self.max_curvature,
        }
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.id, self.test_id)
    }
}

/// Settings accepted by the determination core.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Average percent error above which a test is flagged.
    pub error_tolerance_percent: f64,
    pub enable_casagrande: bool,
    pub enable_oikawa: bool,
    pub enable_max_curvature: bool,
    /// Produce diagnostic geometry alongside each result.
    pub render_diagnostics: bool,
    /// Number of log-spaced points on the dense evaluation grid.
    pub grid_points: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            error_tolerance_percent: 50.0,
            enable_casagrande: true,
            enable_oikawa: true,
            enable_max_curvature: true,
            render_diagnostics: false,
            grid_points: 1000,
        }
    }
}

impl AnalysisConfig {
    /// Upper end of the recommended tolerance domain.
    pub const MAX_TOLERANCE_PERCENT: f64 = 300.0;

    pub fn is_enabled(&self, method: MethodKind) -> bool {
        match method {
            MethodKind::Casagrande => self.enable_casagrande,
            MethodKind::Oikawa => self.enable_oikawa,
            MethodKind::MaxCurvature => self.enable_max_curvature,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let tol = self.error_tolerance_percent;
        if !(tol.is_finite() && (0.0..=Self::MAX_TOLERANCE_PERCENT).contains(&tol)) {
            return Err(AppError::new(
                2,
                format!(
                    "Invalid error tolerance {tol}% (must be within 0..={}).",
                    Self::MAX_TOLERANCE_PERCENT
                ),
            ));
        }
        if self.grid_points < 2 {
            return Err(AppError::new(2, "Grid points must be >= 2."));
        }
        if !MethodKind::ALL.iter().any(|&m| self.is_enabled(m)) {
            return Err(AppError::new(2, "At least one method must be enabled."));
        }
        Ok(())
    }
}
