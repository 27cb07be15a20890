//! Compressibility-curve point selection.
//!
//! A consolidation test is recorded chronologically: loading, one or more
//! unload/reload loops, and often a final unloading leg. Only the monotonic
//! loading path lies on the sigmoidal compressibility curve, so the loop interiors
//! are removed before any curve fitting.
//!
//! Rules:
//! 1. An unload onset is a strict interior local maximum of stress.
//! 2. Its reload completes at the first later increment whose stress exceeds the
//!    onset stress. Without one the unload is terminal.
//! 3. Increments strictly between an onset and its completion (or after a
//!    terminal onset) are excluded.

use crate::domain::{CompressibilityCurve, Increment};
use crate::error::PcError;

/// Indices `i` with `stress[i]` strictly above both neighbours.
pub fn unload_onsets(stress: &[f64]) -> Vec<usize> {
    if stress.len() < 3 {
        return Vec::new();
    }
    (1..stress.len() - 1)
        .filter(|&i| stress[i] > stress[i + 1] && stress[i] > stress[i - 1])
        .collect()
}

/// Select the increments on the compressibility curve.
///
/// Returns the curve and the index (into `increments`) of the first unload onset.
pub fn select_compressibility_curve(
    increments: &[Increment],
) -> Result<(CompressibilityCurve, usize), PcError> {
    let n = increments.len();
    let stress: Vec<f64> = increments.iter().map(|inc| inc.stress).collect();

    let onsets = unload_onsets(&stress);
    let Some(&first_unload) = onsets.first() else {
        return Err(PcError::DataShape(
            "no unload/reload cycle found (stress never decreases after a peak)".to_string(),
        ));
    };

    let mut excluded = vec![false; n];
    for &onset in &onsets {
        let completion = (onset + 1..n).find(|&k| stress[k] > stress[onset]);
        let end = completion.unwrap_or(n);
        for flag in &mut excluded[onset + 1..end] {
            *flag = true;
        }
    }

    let retained: Vec<usize> = (0..n).filter(|&i| !excluded[i]).collect();
    let curve = CompressibilityCurve {
        stress: retained.iter().map(|&i| increments[i].stress).collect(),
        void_ratio: retained.iter().map(|&i| increments[i].void_ratio).collect(),
        retained,
    };
    Ok((curve, first_unload))
}
