//! Preconsolidation-pressure determination methods.
//!
//! Each method is a pure function of a prepared test:
//!
//! - Casagrande (1936): steepest tangent vs. bisector at the maximum-curvature point,
//!   in `e`–`log10(σ)` space (`casagrande`)
//! - Oikawa (1987): steepest tangent vs. secant through the first two points, in
//!   `log10(1+e)`–`log10(σ)` space (`oikawa`)
//! - Maximum curvature (Gregory et al., 2006): stress of maximum curvature of a
//!   fitted Gompertz curve (`max_curvature`)
//!
//! All three share the loading-path selection, which is done once per test.

pub mod casagrande;
pub mod max_curvature;
pub mod oikawa;

pub use casagrande::*;
pub use max_curvature::*;
pub use oikawa::*;

use crate::curve::select_compressibility_curve;
use crate::domain::{CompressibilityCurve, ConsolidationTest, MethodKind, MethodResult, YSpace};
use crate::error::PcError;

/// Percent deviation of the recorded pressure from a calculated one.
///
/// `(recorded - calculated) / calculated * 100`: relative to the *calculated*
/// value, so overestimating the pressure is penalised more than underestimating it
/// by the same amount.
pub fn percent_error(recorded_pc: f64, calculated_pc: f64) -> f64 {
    (recorded_pc - calculated_pc) / calculated_pc * 100.0
}

/// A validated test together with its loading-path selection.
#[derive(Debug, Clone)]
pub struct PreparedTest<'a> {
    pub test: &'a ConsolidationTest,
    pub curve: CompressibilityCurve,
    /// Index (into the test increments) of the first unload onset.
    pub first_unload_index: usize,
}

impl<'a> PreparedTest<'a> {
    pub fn prepare(test: &'a ConsolidationTest) -> Result<Self, PcError> {
        test.validate()?;
        let (curve, first_unload_index) = select_compressibility_curve(&test.increments)?;
        if curve.len() < 2 {
            return Err(PcError::DataShape(format!(
                "compressibility curve has {} point(s), at least 2 required",
                curve.len()
            )));
        }
        Ok(Self {
            test,
            curve,
            first_unload_index,
        })
    }

    pub fn first_unload_stress(&self) -> f64 {
        self.test.increments[self.first_unload_index].stress
    }

    /// Every increment (loops included) in `(stress, y)` for plotting.
    pub fn observed(&self, y_space: YSpace) -> Vec<(f64, f64)> {
        self.test
            .increments
            .iter()
            .map(|inc| (inc.stress, y_space.transform(inc.void_ratio)))
            .collect()
    }
}

/// Run one method on a prepared test.
pub fn run_method(
    method: MethodKind,
    prepared: &PreparedTest<'_>,
    grid_points: usize,
    render: bool,
) -> Result<MethodResult, PcError> {
    match method {
        MethodKind::Casagrande => casagrande(prepared, grid_points, render),
        MethodKind::Oikawa => oikawa(prepared, grid_points, render),
        MethodKind::MaxCurvature => max_curvature(prepared, grid_points, render),
    }
}

/// Wrap a computed pressure into a result, rejecting non-physical estimates.
fn finish(
    method: MethodKind,
    recorded_pc: f64,
    estimated_pc: f64,
    diagnostics: Option<crate::domain::MethodDiagnostics>,
) -> Result<MethodResult, PcError> {
    if !(estimated_pc.is_finite() && estimated_pc > 0.0) {
        return Err(PcError::DegenerateGeometry(format!(
            "{} estimate is not a positive finite pressure: {estimated_pc}",
            method.display_name()
        )));
    }
    Ok(MethodResult {
        estimated_pc,
        percent_error: percent_error(recorded_pc, estimated_pc),
        diagnostics,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Increment;

    #[test]
    fn percent_error_is_relative_to_the_calculated_value() {
        assert!((percent_error(120.0, 100.0) - 20.0).abs() < 1e-12);
        // Same absolute miss, larger magnitude when the calculation is low.
        assert!(percent_error(100.0, 80.0).abs() > percent_error(100.0, 120.0).abs());
    }

    #[test]
    fn prepare_requires_an_unload_cycle() {
        let test = ConsolidationTest {
            id: 1,
            test_id: "MONO".to_string(),
            increments: vec![
                Increment::new(10.0, 1.0),
                Increment::new(20.0, 0.98),
                Increment::new(40.0, 0.95),
                Increment::new(80.0, 0.90),
            ],
            recorded_pc: 30.0,
        };
        assert!(matches!(PreparedTest::prepare(&test), Err(PcError::DataShape(_))));
    }

    #[test]
    fn prepare_keeps_the_loading_path() {
        let test = fixtures::synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        assert_eq!(prepared.first_unload_index, 3);
        assert_eq!(prepared.first_unload_stress(), 100.0);
        assert_eq!(
            prepared.curve.stress,
            vec![12.5, 25.0, 50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0]
        );
        assert_eq!(prepared.observed(YSpace::VoidRatio).len(), test.increments.len());
    }
}
