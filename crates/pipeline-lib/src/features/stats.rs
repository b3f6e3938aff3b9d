//! Order statistics and ratios used by the aggregation rules
//!
//! The percentile definition here is the one both training and serving must
//! agree on: sort ascending, take rank `p/100 * (n - 1)`, and interpolate
//! linearly between the two neighbouring order statistics.

/// Percentile with linear interpolation between order statistics.
///
/// Returns `None` for an empty input. NaN values are ignored.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Arithmetic mean, `None` for an empty input
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `numerator / max(denominator, 1)`.
///
/// The flag is true when the guard fired, i.e. the denominator was zero and
/// 1 was substituted.
pub fn guarded_ratio(numerator: u64, denominator: u64) -> (f64, bool) {
    if denominator == 0 {
        (numerator as f64, true)
    } else {
        (numerator as f64 / denominator as f64, false)
    }
}
