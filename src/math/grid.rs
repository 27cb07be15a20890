//! Dense evaluation grids and index searches over them.
//!
//! All three methods sample their fitted curve on a logarithmically spaced stress
//! grid and then pick a characteristic index (steepest slope, maximum curvature).
//! Index searches are deterministic: the first occurrence wins on ties and
//! non-finite samples are ignored.

use crate::error::PcError;

/// Generate `steps` log10-spaced points between `min` and `max` (inclusive).
///
/// The endpoints are returned exactly so that the grid starts and ends on the
/// outermost knots of the curve it samples.
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, PcError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(PcError::DataShape(format!(
            "invalid stress range for grid: min={min}, max={max} (must be finite, >0, and max>min)"
        )));
    }
    if steps < 2 {
        return Err(PcError::DataShape("grid steps must be >= 2".to_string()));
    }

    let lo = min.log10();
    let hi = max.log10();
    let step = (hi - lo) / (steps as f64 - 1.0);

    let mut out: Vec<f64> = (0..steps).map(|i| 10f64.powf(lo + step * i as f64)).collect();
    out[0] = min;
    out[steps - 1] = max;
    Ok(out)
}

/// Index of the smallest finite value (first occurrence).
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the largest finite value (first occurrence).
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Curvature of a plane curve `y(x)`: `|y''| / (1 + y'^2)^(3/2)`.
pub fn curvature(d1: f64, d2: f64) -> f64 {
    d2.abs() / (1.0 + d1 * d1).powf(1.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(12.5, 3200.0, 1000).unwrap();
        assert_eq!(v.len(), 1000);
        assert_eq!(v[0], 12.5);
        assert_eq!(v[999], 3200.0);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn log_space_is_evenly_spaced_in_log10() {
        let v = log_space(1.0, 1000.0, 4).unwrap();
        for (got, want) in v.iter().zip([1.0, 10.0, 100.0, 1000.0]) {
            assert!((got - want).abs() < 1e-9 * want);
        }
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 10.0, 5).is_err());
        assert!(log_space(10.0, 10.0, 5).is_err());
        assert!(log_space(1.0, 10.0, 1).is_err());
    }

    #[test]
    fn arg_searches_take_first_occurrence_and_skip_nan() {
        let v = [3.0, f64::NAN, -1.0, 5.0, -1.0, 5.0];
        assert_eq!(argmin(&v), Some(2));
        assert_eq!(argmax(&v), Some(3));
        assert_eq!(argmin(&[f64::NAN]), None);
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn curvature_of_straight_line_is_zero() {
        assert_eq!(curvature(-0.4, 0.0), 0.0);
        assert!((curvature(0.0, 2.0) - 2.0).abs() < 1e-12);
    }
}
