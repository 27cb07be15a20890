//! Smooth interpolant of the compressibility curve and its dense sampling.

use crate::domain::{CompressibilityCurve, YSpace};
use crate::error::PcError;
use crate::math::{curvature, log_space, CubicSpline};

/// `y = f(log10(stress))`, interpolating every compressibility-curve point.
#[derive(Debug, Clone)]
pub struct FittedCurve {
    spline: CubicSpline,
    y_space: YSpace,
}

impl FittedCurve {
    pub fn from_curve(curve: &CompressibilityCurve, y_space: YSpace) -> Result<Self, PcError> {
        let xs: Vec<f64> = curve.stress.iter().map(|s| s.log10()).collect();
        let ys: Vec<f64> = curve.void_ratio.iter().map(|&e| y_space.transform(e)).collect();
        let spline = CubicSpline::not_a_knot(&xs, &ys)?;
        Ok(Self { spline, y_space })
    }

    pub fn y_space(&self) -> YSpace {
        self.y_space
    }

    pub fn value(&self, log_stress: f64) -> f64 {
        self.spline.value(log_stress)
    }

    pub fn first_derivative(&self, log_stress: f64) -> f64 {
        self.spline.first_derivative(log_stress)
    }

    pub fn second_derivative(&self, log_stress: f64) -> f64 {
        self.spline.second_derivative(log_stress)
    }

    /// Sample on `points` log-spaced stresses spanning the curve.
    pub fn sample(&self, curve: &CompressibilityCurve, points: usize) -> Result<CurveSamples, PcError> {
        let stress = log_space(curve.stress_min(), curve.stress_max(), points)?;
        Ok(CurveSamples::from_fn(stress, |x| {
            (self.value(x), self.first_derivative(x), self.second_derivative(x))
        }))
    }
}

/// Value and derivatives of a curve on a dense stress grid (index-aligned).
#[derive(Debug, Clone)]
pub struct CurveSamples {
    pub stress: Vec<f64>,
    pub log_stress: Vec<f64>,
    pub value: Vec<f64>,
    pub d1: Vec<f64>,
    pub d2: Vec<f64>,
}

impl CurveSamples {
    /// Evaluate `f(log10(stress)) -> (value, d1, d2)` on every grid stress.
    pub fn from_fn<F>(stress: Vec<f64>, f: F) -> Self
    where
        F: Fn(f64) -> (f64, f64, f64),
    {
        let log_stress: Vec<f64> = stress.iter().map(|s| s.log10()).collect();
        let mut value = Vec::with_capacity(stress.len());
        let mut d1 = Vec::with_capacity(stress.len());
        let mut d2 = Vec::with_capacity(stress.len());
        for &x in &log_stress {
            let (v, g, h) = f(x);
            value.push(v);
            d1.push(g);
            d2.push(h);
        }
        Self {
            stress,
            log_stress,
            value,
            d1,
            d2,
        }
    }

    pub fn len(&self) -> usize {
        self.stress.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stress.is_empty()
    }

    pub fn curvature(&self) -> Vec<f64> {
        self.d1.iter().zip(self.d2.iter()).map(|(&g, &h)| curvature(g, h)).collect()
    }
}
