//! Cubic spline interpolation.
//!
//! The compressibility curve is interpolated in `(log10(stress), y)` with a
//! piecewise cubic that is twice continuously differentiable, so slopes and
//! curvature can be read off analytically at any point.
//!
//! Implementation choices:
//! - Not-a-knot end conditions (third derivative continuous across the second
//!   and penultimate knots). With three knots this degenerates to the single
//!   parabola through them; with two knots to the straight line.
//! - We solve for the knot second derivatives `M_i` with a dense LU from
//!   `nalgebra`. Test curves have tens of knots, so the dense solve is cheap and
//!   keeps the end rows simple.
//! - Evaluation outside the knot range extends the boundary polynomial.

use nalgebra::{DMatrix, DVector};

use crate::error::PcError;

#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build a not-a-knot spline through `(xs[i], ys[i])`.
    ///
    /// `xs` must be strictly increasing and all values finite.
    pub fn not_a_knot(xs: &[f64], ys: &[f64]) -> Result<Self, PcError> {
        if xs.len() != ys.len() {
            return Err(PcError::DataShape(format!(
                "spline abscissae ({}) and ordinates ({}) differ in length",
                xs.len(),
                ys.len()
            )));
        }
        let n = xs.len();
        if n < 2 {
            return Err(PcError::DataShape(format!("spline needs at least 2 knots, got {n}")));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(PcError::NonFiniteValue("spline knot is not finite".to_string()));
        }
        if let Some(i) = (1..n).find(|&i| xs[i] <= xs[i - 1]) {
            return Err(PcError::DataShape(format!(
                "spline knots must be strictly increasing (knot {i}: {} after {})",
                xs[i],
                xs[i - 1]
            )));
        }

        let m = if n == 2 {
            vec![0.0, 0.0]
        } else {
            solve_second_derivatives(xs, ys)?
        };

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.xs
    }

    pub fn value(&self, x: f64) -> f64 {
        let (i, h, a, b) = self.locate(x);
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    pub fn first_derivative(&self, x: f64) -> f64 {
        let (i, h, a, b) = self.locate(x);
        (self.ys[i + 1] - self.ys[i]) / h - (3.0 * a * a - 1.0) / 6.0 * h * self.m[i]
            + (3.0 * b * b - 1.0) / 6.0 * h * self.m[i + 1]
    }

    pub fn second_derivative(&self, x: f64) -> f64 {
        let (i, _, a, b) = self.locate(x);
        a * self.m[i] + b * self.m[i + 1]
    }

    /// Interval index, width and barycentric weights for `x`.
    fn locate(&self, x: f64) -> (usize, f64, f64, f64) {
        let n = self.xs.len();
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        (lo, h, a, b)
    }
}

fn solve_second_derivatives(xs: &[f64], ys: &[f64]) -> Result<Vec<f64>, PcError> {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let slope: Vec<f64> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (slope[i] - slope[i - 1]);
    }

    if n == 3 {
        // Single parabola: constant second derivative.
        a[(0, 0)] = 1.0;
        a[(0, 1)] = -1.0;
        a[(2, 1)] = 1.0;
        a[(2, 2)] = -1.0;
    } else {
        a[(0, 0)] = h[1];
        a[(0, 1)] = -(h[0] + h[1]);
        a[(0, 2)] = h[0];
        a[(n - 1, n - 3)] = h[n - 2];
        a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
        a[(n - 1, n - 1)] = h[n - 3];
    }

    let m = a
        .lu()
        .solve(&rhs)
        .ok_or_else(|| PcError::DataShape("spline system is singular".to_string()))?;
    if m.iter().any(|v| !v.is_finite()) {
        return Err(PcError::NonFiniteValue("spline second derivatives are not finite".to_string()));
    }
    Ok(m.iter().copied().collect())
}
