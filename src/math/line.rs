//! Straight lines in `(log10(stress), y)` space.
//!
//! Every graphical construction (virgin compression line, bisector, recompression
//! secant) is a line `y = slope * x + intercept` with `x = log10(stress)`, and the
//! pressure estimate is the stress at which two such lines meet.

use serde::{Deserialize, Serialize};

use crate::error::PcError;

/// Relative slope difference below which two lines are treated as parallel.
const PARALLEL_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Line with the given slope through `(x0, y0)`.
    pub fn through(x0: f64, y0: f64, slope: f64) -> Self {
        Self {
            slope,
            intercept: y0 - slope * x0,
        }
    }

    /// Secant through two points.
    pub fn secant(p0: (f64, f64), p1: (f64, f64)) -> Result<Self, PcError> {
        let dx = p0.0 - p1.0;
        if dx == 0.0 || !dx.is_finite() {
            return Err(PcError::DegenerateGeometry(format!(
                "secant through points with equal abscissa {}",
                p0.0
            )));
        }
        let slope = (p0.1 - p1.1) / dx;
        Ok(Self::through(p0.0, p0.1, slope))
    }

    /// Horizontal line `y = y0`.
    pub fn horizontal(y0: f64) -> Self {
        Self::new(0.0, y0)
    }

    pub fn y_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Value at a stress (the abscissa is `log10(stress)`).
    pub fn y_at_stress(&self, stress: f64) -> f64 {
        self.y_at(stress.log10())
    }

    /// Abscissa of the intersection with `other`: `(c2 - c1) / (m1 - m2)`.
    pub fn intersect_x(&self, other: &Line) -> Result<f64, PcError> {
        let dm = self.slope - other.slope;
        let scale = 1f64.max(self.slope.abs()).max(other.slope.abs());
        if !dm.is_finite() || dm.abs() <= PARALLEL_EPS * scale {
            return Err(PcError::DegenerateGeometry(format!(
                "lines are parallel (slopes {} and {})",
                self.slope, other.slope
            )));
        }
        let x = (other.intercept - self.intercept) / dm;
        if !x.is_finite() {
            return Err(PcError::DegenerateGeometry(format!("intersection is not finite: {x}")));
        }
        Ok(x)
    }

    /// Stress at the intersection with `other`: `10^x`.
    pub fn intersect_stress(&self, other: &Line) -> Result<f64, PcError> {
        let x = self.intersect_x(other)?;
        let stress = 10f64.powf(x);
        if !(stress.is_finite() && stress > 0.0) {
            return Err(PcError::DegenerateGeometry(format!(
                "intersection at log-stress {x} is outside the representable range"
            )));
        }
        Ok(stress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_known_lines() {
        let l1 = Line::new(-0.4, 1.0);
        let l2 = Line::new(-0.2, 0.6);
        let x = l1.intersect_x(&l2).unwrap();
        assert!((x - 2.0).abs() < 1e-12);
        let pc = l1.intersect_stress(&l2).unwrap();
        assert!((pc - 100.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_lines_are_degenerate() {
        let l1 = Line::new(-0.3, 1.0);
        let l2 = Line::new(-0.3, 0.5);
        assert!(matches!(l1.intersect_x(&l2), Err(PcError::DegenerateGeometry(_))));
        assert!(matches!(l1.intersect_stress(&l2), Err(PcError::DegenerateGeometry(_))));
    }

    #[test]
    fn secant_and_point_slope_forms_agree() {
        let s = Line::secant((1.0, 0.9), (2.0, 0.7)).unwrap();
        assert!((s.slope + 0.2).abs() < 1e-12);
        assert!((s.y_at(1.0) - 0.9).abs() < 1e-12);
        assert!((s.y_at(2.0) - 0.7).abs() < 1e-12);
        assert!((s.y_at_stress(100.0) - 0.7).abs() < 1e-12);
        assert!(Line::secant((1.0, 0.9), (1.0, 0.7)).is_err());
    }
}
