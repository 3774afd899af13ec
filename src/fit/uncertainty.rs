//! Simulated uncertainty intervals.
//!
//! Each simulation extends the trend with fresh changepoints beyond the
//! training window, drawn with the same frequency and average magnitude as the
//! fitted ones, and adds observation noise:
//!
//! - count: `Poisson(S · (T - 1))`, `S` fitted changepoints, `T` the largest
//!   scaled time in the frame (the cutoff sits at `t = 1`)
//! - locations: uniform on `(1, T)`
//! - deltas: Laplace with scale `mean |δ|`
//! - noise: `N(0, σ_obs)`
//!
//! Bounds are the `(1 - w) / 2` and `(1 + w) / 2` percentiles of the simulated
//! values. History rows only get the noise term, so their band reflects the
//! in-sample residual spread.

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal, Poisson};

use crate::domain::ModelConfig;
use crate::error::AppError;
use crate::math::{hinge, percentile_sorted};
use crate::models::FittedModel;

/// Lower/upper bound for one frame row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Interval for every frame row.
///
/// Rows whose `yhat` is undefined get undefined bounds. The bounds always
/// bracket `yhat`.
pub fn sample_intervals(
    model: &FittedModel,
    dates: &[NaiveDate],
    yhat: &[Option<f64>],
    config: &ModelConfig,
) -> Result<Vec<Interval>, AppError> {
    if config.uncertainty_samples == 0 {
        return Ok(yhat.iter().map(|&y| Interval { lower: y, upper: y }).collect());
    }

    let t: Vec<f64> = dates.iter().map(|&d| model.time.t(d)).collect();
    let t_max = t.iter().copied().fold(1.0, f64::max);

    let deltas = model.deltas();
    let mean_abs_delta = if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
    };
    let change_rate = deltas.len() as f64 * (t_max - 1.0);

    let dist_err = |e: &dyn std::fmt::Display| AppError::fit(format!("Uncertainty sampling error: {e}"));
    let noise = Normal::new(0.0, model.sigma_obs).map_err(|e| dist_err(&e))?;
    let magnitude = Exp::new(1.0 / (mean_abs_delta + 1e-8)).map_err(|e| dist_err(&e))?;
    let count = if change_rate > 0.0 {
        Some(Poisson::new(change_rate).map_err(|e| dist_err(&e))?)
    } else {
        None
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let samples = config.uncertainty_samples;
    let mut draws: Vec<Vec<f64>> = yhat
        .iter()
        .map(|y| if y.is_some() { Vec::with_capacity(samples) } else { Vec::new() })
        .collect();
    let mut new_changes: Vec<(f64, f64)> = Vec::new();

    for _ in 0..samples {
        new_changes.clear();
        if let Some(count) = &count {
            let k: f64 = count.sample(&mut rng);
            for _ in 0..k as usize {
                let at = rng.gen_range(1.0..t_max);
                let size = magnitude.sample(&mut rng);
                let delta = if rng.gen_bool(0.5) { size } else { -size };
                new_changes.push((at, delta));
            }
        }

        for ((&ti, y), out) in t.iter().zip(yhat).zip(draws.iter_mut()) {
            let Some(y) = y else { continue };
            let drift: f64 = new_changes.iter().map(|&(s, d)| d * hinge(ti, s)).sum();
            out.push(y + (drift + noise.sample(&mut rng)) * model.y_scale);
        }
    }

    let lower_q = (1.0 - config.interval_width) / 2.0;
    let upper_q = (1.0 + config.interval_width) / 2.0;

    Ok(yhat
        .iter()
        .zip(draws.iter_mut())
        .map(|(&y, values)| {
            let Some(y) = y else {
                return Interval { lower: None, upper: None };
            };
            values.sort_by(f64::total_cmp);
            let lower = percentile_sorted(values, lower_q).map_or(y, |v| v.min(y));
            let upper = percentile_sorted(values, upper_q).map_or(y, |v| v.max(y));
            Interval {
                lower: Some(lower),
                upper: Some(upper),
            }
        })
        .collect())
}
