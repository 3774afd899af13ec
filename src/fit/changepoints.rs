//! Trend changepoint placement.
//!
//! Changepoints are spread uniformly by row index over the first
//! `changepoint_range` share of the history, so unevenly spaced data puts more
//! changepoints where there are more observations.

/// Changepoint locations on the scaled time axis.
///
/// `t` holds the scaled time of each training row, ascending. At most
/// `requested` changepoints are returned, and never more than `rows - 1`
/// within the covered range. The first row is never a changepoint.
pub fn place_changepoints(t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let covered = ((t.len() as f64) * range.clamp(0.0, 1.0)).floor() as usize;
    let count = requested.min(covered.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last_index = (covered - 1) as f64;
    let mut out: Vec<f64> = (1..=count)
        .map(|i| {
            let idx = (last_index * i as f64 / count as f64).round() as usize;
            t[idx]
        })
        .collect();
    out.dedup();
    out
}
