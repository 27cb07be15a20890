//! Four-parameter Gompertz sigmoid.
//!
//! `g(x) = a + c * exp(-exp(b * (x - m)))` with `x = log10(stress)`.
//!
//! For `b, c > 0` the curve falls from `a + c` (small stress) to `a` (large
//! stress), which is the shape of a void ratio against log-stress curve. The
//! fitter relies on two primitive operations:
//! - the parameter gradient `∂g/∂(a, b, c, m)` (for the regression Jacobian)
//! - the closed-form slope and curvature in `x` (for the maximum-curvature search)
//!
//! Numerical notes:
//! - With `E = exp(b (x - m))`, every `x`-derivative carries a factor `exp(-E)`.
//!   Once `E` overflows the product is zero, so we return zero instead of
//!   evaluating `inf * 0`.

/// Parameter vector `(a, b, c, m)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GompertzParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub m: f64,
}

/// Beyond this `E`, `exp(-E)` underflows to zero in `f64`.
const E_UNDERFLOW: f64 = 745.0;

impl GompertzParams {
    pub const LEN: usize = 4;

    pub fn from_slice(p: &[f64]) -> Self {
        Self {
            a: p[0],
            b: p[1],
            c: p[2],
            m: p[3],
        }
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![self.a, self.b, self.c, self.m]
    }

    /// `(E, exp(-E))` at `x`.
    fn terms(&self, x: f64) -> (f64, f64) {
        let e = (self.b * (x - self.m)).exp();
        (e, (-e).exp())
    }

    pub fn value(&self, x: f64) -> f64 {
        let (_, f) = self.terms(x);
        self.a + self.c * f
    }

    /// `g'(x) = b c exp(-E) (-E)`.
    pub fn first_derivative(&self, x: f64) -> f64 {
        let (e, f) = self.terms(x);
        if e > E_UNDERFLOW {
            return 0.0;
        }
        self.b * self.c * f * (-e)
    }

    /// `g''(x) = b² c exp(-E) E (E - 1)`.
    pub fn second_derivative(&self, x: f64) -> f64 {
        let (e, f) = self.terms(x);
        if e > E_UNDERFLOW {
            return 0.0;
        }
        self.b * self.b * self.c * f * e * (e - 1.0)
    }

    /// Fill `out` with `∂g/∂(a, b, c, m)` at `x`.
    ///
    /// # Panics
    /// Panics if `out` is shorter than [`GompertzParams::LEN`].
    pub fn fill_gradient(&self, x: f64, out: &mut [f64]) {
        let (e, f) = self.terms(x);
        let ef = if e > E_UNDERFLOW { 0.0 } else { e * f };
        out[0] = 1.0;
        out[1] = -self.c * ef * (x - self.m);
        out[2] = f;
        out[3] = self.c * self.b * ef;
    }
}

/// `g(x)` for a raw parameter slice `(a, b, c, m)`.
pub fn gompertz(x: f64, p: &[f64]) -> f64 {
    GompertzParams::from_slice(p).value(x)
}

/// `∂g/∂p` for a raw parameter slice `(a, b, c, m)`.
pub fn gompertz_gradient(x: f64, p: &[f64], out: &mut [f64]) {
    GompertzParams::from_slice(p).fill_gradient(x, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn central_diff<F: Fn(f64) -> f64>(f: F, x: f64, h: f64) -> f64 {
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    #[test]
    fn closed_form_derivatives_match_numerical_differentiation() {
        let p = GompertzParams { a: 0.0, b: 1.0, c: -1.0, m: 0.0 };
        let h = 1e-5;

        let d1_num = central_diff(|x| p.value(x), 0.0, h);
        let d2_num = (p.value(h) - 2.0 * p.value(0.0) + p.value(-h)) / (h * h);

        assert!((p.first_derivative(0.0) - d1_num).abs() < 1e-8);
        assert!((p.second_derivative(0.0) - d2_num).abs() < 1e-4);
        // At x = m, E = 1: g' = b c e^{-1} (-1) and g'' = 0.
        assert!((p.first_derivative(0.0) - (-1f64).exp()).abs() < 1e-12);
        assert!(p.second_derivative(0.0).abs() < 1e-12);
    }

    #[test]
    fn derivatives_match_away_from_the_centre() {
        let p = GompertzParams { a: 0.5, b: 2.5, c: 0.6, m: 2.3 };
        let h = 1e-5;
        for &x in &[1.2, 2.0, 2.3, 2.9, 3.4] {
            let d1_num = central_diff(|x| p.value(x), x, h);
            let d2_num = central_diff(|x| p.first_derivative(x), x, h);
            assert!((p.first_derivative(x) - d1_num).abs() < 1e-7, "g'({x})");
            assert!((p.second_derivative(x) - d2_num).abs() < 1e-6, "g''({x})");
        }
    }

    #[test]
    fn parameter_gradient_matches_numerical_differentiation() {
        let base = [0.5, 2.5, 0.6, 2.3];
        let x = 2.1;
        let mut grad = [0.0; 4];
        gompertz_gradient(x, &base, &mut grad);
        let h = 1e-6;
        for j in 0..4 {
            let mut hi = base;
            let mut lo = base;
            hi[j] += h;
            lo[j] -= h;
            let num = (gompertz(x, &hi) - gompertz(x, &lo)) / (2.0 * h);
            assert!((grad[j] - num).abs() < 1e-7, "param {j}: {} vs {num}", grad[j]);
        }
    }

    #[test]
    fn far_tail_is_flat_not_nan() {
        let p = GompertzParams { a: 0.5, b: 50.0, c: 0.6, m: 0.0 };
        assert_eq!(p.first_derivative(100.0), 0.0);
        assert_eq!(p.second_derivative(100.0), 0.0);
        assert!((p.value(100.0) - 0.5).abs() < 1e-12);
        let mut g = [0.0; 4];
        p.fill_gradient(100.0, &mut g);
        assert!(g.iter().all(|v| v.is_finite()));
    }
}
