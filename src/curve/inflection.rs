//! Inflection detection on a sampled curve.
//!
//! Beyond the first inflection of the virgin branch the curve flattens again
//! (secondary compression dominates), so the steepest-tangent and curvature
//! searches stop there.

use crate::curve::CurveSamples;

/// First grid index `i` with `stress[i] > after_stress` where `d2` changes sign
/// between `i` and `i + 1`.
pub fn first_inflection(samples: &CurveSamples, after_stress: f64) -> Option<usize> {
    (0..samples.len().saturating_sub(1))
        .find(|&i| samples.stress[i] > after_stress && samples.d2[i] * samples.d2[i + 1] < 0.0)
}

/// Exclusive end of the search range: grid indices strictly before the inflection.
pub fn search_end(samples: &CurveSamples, inflection: Option<usize>) -> usize {
    inflection.unwrap_or(samples.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(stress: Vec<f64>, d2: Vec<f64>) -> CurveSamples {
        let n = stress.len();
        CurveSamples {
            log_stress: stress.iter().map(|s: &f64| s.log10()).collect(),
            stress,
            value: vec![0.0; n],
            d1: vec![0.0; n],
            d2,
        }
    }

    #[test]
    fn sign_changes_before_the_unload_stress_are_ignored() {
        let s = samples(
            vec![10.0, 20.0, 40.0, 80.0, 160.0, 320.0],
            vec![1.0, -1.0, 1.0, 1.0, -0.5, -0.2],
        );
        // The change between 10 and 20 kPa happens below the first unload at 40 kPa.
        assert_eq!(first_inflection(&s, 40.0), Some(3));
        assert_eq!(search_end(&s, Some(3)), 3);
    }

    #[test]
    fn no_inflection_uses_the_full_grid() {
        let s = samples(vec![10.0, 20.0, 40.0], vec![1.0, 0.5, 0.1]);
        assert_eq!(first_inflection(&s, 5.0), None);
        assert_eq!(search_end(&s, None), 3);
    }

    #[test]
    fn touching_zero_is_not_a_sign_change() {
        let s = samples(vec![10.0, 20.0, 40.0], vec![1.0, 0.0, -1.0]);
        assert_eq!(first_inflection(&s, 5.0), None);
    }
}
