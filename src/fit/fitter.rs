//! MAP fit of the additive model for one target.
//!
//! Given:
//! - training rows `(date_i, y_i)` with a present target value
//! - standardized regressor values `x̃_i`
//! - the prior scales from `ModelConfig`
//!
//! we minimize
//!
//! ```text
//! ||y - Xβ||² / σ² + Σ β_j² / s_j² + 2 Σ |δ_j| / τ
//! ```
//!
//! The Laplace term on the changepoint deltas is handled by iteratively
//! reweighted ridge: at each pass `|δ|` is replaced by its quadratic upper bound
//! around the previous estimate, giving a per-delta precision of
//! `1 / (τ |δ_prev|)`. The noise level `σ` is re-estimated from the residuals
//! after every pass. Deltas that the data does not support shrink towards zero,
//! which keeps the trend piecewise linear with few effective kinks.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{Dataset, ModelConfig, RegressorSelection};
use crate::error::AppError;
use crate::fit::place_changepoints;
use crate::math::{epoch_days, mean, sample_std, solve_ridge};
use crate::models::{FittedModel, Layout, RegressorScaling, TimeScale, fill_design_row, seasonalities};

/// Prior standard deviation of the trend offset and base slope.
const TREND_PRIOR_SD: f64 = 5.0;
/// Smallest `|δ|` used when reweighting, so zeroed deltas keep a finite penalty.
const DELTA_FLOOR: f64 = 1e-6;
const MIN_SIGMA2: f64 = 1e-12;

/// Fitted model plus fit diagnostics.
#[derive(Debug, Clone)]
pub struct ModelFit {
    pub model: FittedModel,
    /// Observations used (training rows with a target value).
    pub observations: usize,
    /// In-sample RMSE in target units.
    pub rmse: f64,
    /// Non-fatal remarks about the fit (constant regressors, inert terms).
    pub warnings: Vec<String>,
}

/// Fit the additive model for `target` on every training row.
pub fn fit_model(
    training: &Dataset,
    target: &str,
    regressors: &RegressorSelection,
    config: &ModelConfig,
) -> Result<ModelFit, AppError> {
    config.validate()?;

    if !training.has_column(target) {
        return Err(AppError::fit(format!("Target column `{target}` is not in the dataset.")));
    }
    if !training.is_numeric(target) {
        return Err(AppError::fit(format!(
            "Target column `{target}` is not numeric; cannot fit."
        )));
    }

    // Rows with a target value; missing targets are skipped rather than imputed.
    let rows: Vec<(usize, f64)> = (0..training.len())
        .filter_map(|i| training.value(i, target).map(|y| (i, y)))
        .collect();
    if rows.len() < 2 {
        return Err(AppError::fit(format!(
            "Need at least 2 values of `{target}` in the training window (found {}).",
            rows.len()
        )));
    }

    let mut warnings = Vec::new();
    let scalings = regressor_scalings(training, regressors, &rows, &mut warnings)?;
    if config.daily_seasonality {
        warnings.push("Daily seasonality has no effect on daily data.".to_string());
    }

    let (Some(first), Some(cutoff)) = (training.first_date(), training.last_date()) else {
        return Err(AppError::fit("Training window is empty."));
    };
    let time = TimeScale {
        day0: epoch_days(first),
        span: (epoch_days(cutoff) - epoch_days(first)).max(1.0),
    };

    let y_scale = rows.iter().map(|(_, y)| y.abs()).fold(0.0, f64::max);
    let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

    let records = training.records();
    let t: Vec<f64> = rows.iter().map(|&(i, _)| time.t(records[i].ds)).collect();
    let changepoints = place_changepoints(&t, config.n_changepoints, config.changepoint_range);

    let layout = Layout {
        n_changepoints: changepoints.len(),
        seasonalities: seasonalities(config),
        n_regressors: scalings.len(),
    };

    let n = rows.len();
    let p = layout.width();
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];
    let mut x_scaled = vec![0.0; scalings.len()];

    for (r, (&(i, yi), &ti)) in rows.iter().zip(&t).enumerate() {
        for (slot, s) in x_scaled.iter_mut().zip(&scalings) {
            // Presence was checked in `regressor_scalings`.
            *slot = s.apply(training.value(i, &s.name).unwrap_or(s.mu));
        }
        fill_design_row(&layout, &changepoints, ti, epoch_days(records[i].ds), &x_scaled, &mut row);
        for j in 0..p {
            x[(r, j)] = row[j];
        }
        y[r] = yi / y_scale;
    }

    // Fixed prior precisions (relative to unit noise); deltas are filled per pass.
    let mut precision = vec![0.0; p];
    precision[0] = 1.0 / TREND_PRIOR_SD.powi(2);
    precision[1] = 1.0 / TREND_PRIOR_SD.powi(2);
    for i in 0..layout.seasonalities.len() {
        for j in layout.seasonality_range(i) {
            precision[j] = 1.0 / config.seasonality_prior_scale.powi(2);
        }
    }
    for j in layout.regressor_range() {
        precision[j] = 1.0 / config.regressor_prior_scale.powi(2);
    }

    let tau = config.changepoint_prior_scale;
    // First pass treats deltas as Gaussian with sd `tau`.
    let mut delta_precision = vec![1.0 / (tau * tau); layout.n_changepoints];
    let mut sigma2 = sample_variance(y.as_slice()).max(MIN_SIGMA2);

    let passes = config.fit_iterations.max(1);
    let mut beta = DVector::<f64>::zeros(p);
    let mut sse = f64::INFINITY;

    for pass in 0..passes {
        let mut penalties: Vec<f64> = precision.iter().map(|&prec| sigma2 * prec).collect();
        for (col, &prec) in layout.delta_range().zip(&delta_precision) {
            penalties[col] = sigma2 * prec;
        }

        beta = solve_ridge(&x, &y, &penalties).ok_or_else(|| {
            AppError::fit(format!("Least-squares solve failed for target `{target}`."))
        })?;

        let residuals = &y - &x * &beta;
        sse = residuals.norm_squared();
        if !sse.is_finite() {
            return Err(AppError::fit(format!("Fit for `{target}` produced non-finite residuals.")));
        }
        sigma2 = (sse / n as f64).max(MIN_SIGMA2);

        for (prec, col) in delta_precision.iter_mut().zip(layout.delta_range()) {
            *prec = 1.0 / (tau * beta[col].abs().max(DELTA_FLOOR));
        }

        debug!(column = target, pass, sse, sigma = sigma2.sqrt(), "fit pass");
    }

    let sigma_obs = (sse / n as f64).sqrt();
    let model = FittedModel {
        target: target.to_string(),
        layout,
        time,
        y_scale,
        changepoints,
        regressors: scalings,
        beta: beta.iter().copied().collect(),
        sigma_obs,
        cutoff,
    };

    Ok(ModelFit {
        model,
        observations: n,
        rmse: sigma_obs * y_scale,
        warnings,
    })
}

/// Scaling for each selected regressor, computed on the fitted rows.
///
/// Binary {0, 1} regressors are left as is; constant regressors are only
/// centered (their effect is then zero).
fn regressor_scalings(
    training: &Dataset,
    regressors: &RegressorSelection,
    rows: &[(usize, f64)],
    warnings: &mut Vec<String>,
) -> Result<Vec<RegressorScaling>, AppError> {
    let records = training.records();
    let mut out = Vec::with_capacity(regressors.names().len());

    for name in regressors.names() {
        if !training.is_numeric(name) {
            return Err(AppError::fit(format!("Regressor column `{name}` is not numeric.")));
        }

        let mut values = Vec::with_capacity(rows.len());
        for &(i, _) in rows {
            match training.value(i, name) {
                Some(v) => values.push(v),
                None => {
                    return Err(AppError::fit(format!(
                        "Regressor `{name}` has missing values in the training window (first on {}).",
                        records[i].ds
                    )));
                }
            }
        }

        let binary = values.iter().all(|&v| v == 0.0 || v == 1.0);
        let mu = mean(&values).unwrap_or(0.0);
        let std = sample_std(&values).unwrap_or(0.0);

        let scaling = if std < 1e-12 {
            warnings.push(format!(
                "Regressor `{name}` is constant in the training window and has no effect."
            ));
            RegressorScaling { name: name.clone(), mu, std: 1.0 }
        } else if binary {
            RegressorScaling { name: name.clone(), mu: 0.0, std: 1.0 }
        } else {
            RegressorScaling { name: name.clone(), mu, std }
        };
        out.push(scaling);
    }

    Ok(out)
}

fn sample_variance(values: &[f64]) -> f64 {
    sample_std(values).map(|s| s * s).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::domain::TimeSeriesRecord;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + Duration::days(n)
    }

    fn dataset(columns: &[&str], rows: Vec<(i64, Vec<Option<f64>>)>) -> Dataset {
        let records = rows
            .into_iter()
            .map(|(d, values)| TimeSeriesRecord { ds: day(d), values })
            .collect();
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), records, BTreeSet::new()).unwrap()
    }

    fn weekly(d: i64) -> f64 {
        let dow = d.rem_euclid(7) as f64;
        40.0 * (2.0 * std::f64::consts::PI * dow / 7.0).sin()
    }

    #[test]
    fn recovers_linear_trend_weekly_shape_and_regressor() {
        let rows = (0..200)
            .map(|d| {
                let x = if d % 3 == 0 { 10.0 } else { 2.0 };
                let y = 500.0 + 2.0 * d as f64 + weekly(d) + 5.0 * x;
                (d, vec![Some(y), Some(x)])
            })
            .collect();
        let ds = dataset(&["y", "x"], rows);
        let sel = RegressorSelection::new(&["x".to_string()], &ds, "y").unwrap();

        let fit = fit_model(&ds, "y", &sel, &ModelConfig::default()).unwrap();
        assert_eq!(fit.observations, 200);
        assert!(fit.rmse < 2.0, "rmse = {}", fit.rmse);

        for d in [10, 77, 150] {
            let x = if d % 3 == 0 { 10.0 } else { 2.0 };
            let expected = 500.0 + 2.0 * d as f64 + weekly(d) + 5.0 * x;
            let got = fit.model.predict(day(d), &[Some(x)]).yhat().unwrap();
            assert!((got - expected).abs() < 5.0, "day {d}: {got} vs {expected}");
        }
    }

    #[test]
    fn non_numeric_target_is_a_fit_error() {
        let records = vec![
            TimeSeriesRecord { ds: day(0), values: vec![None] },
            TimeSeriesRecord { ds: day(1), values: vec![Some(1.0)] },
        ];
        let ds = Dataset::new(vec!["y".into()], records, BTreeSet::from(["y".to_string()])).unwrap();
        let err = fit_model(&ds, "y", &RegressorSelection::default(), &ModelConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fit);
        assert!(err.message().contains("not numeric"));
    }

    #[test]
    fn missing_regressor_in_training_is_a_fit_error() {
        let ds = dataset(
            &["y", "x"],
            vec![
                (0, vec![Some(1.0), Some(1.0)]),
                (1, vec![Some(2.0), None]),
                (2, vec![Some(3.0), Some(2.0)]),
            ],
        );
        let sel = RegressorSelection::new(&["x".to_string()], &ds, "y").unwrap();
        let err = fit_model(&ds, "y", &sel, &ModelConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Fit);
        assert!(err.message().contains("`x`"));
        assert!(err.message().contains(&day(1).to_string()));
    }

    #[test]
    fn too_few_target_values_is_a_fit_error() {
        let ds = dataset(&["y"], vec![(0, vec![Some(1.0)]), (1, vec![None])]);
        let err = fit_model(&ds, "y", &RegressorSelection::default(), &ModelConfig::default()).unwrap_err();
        assert!(err.message().contains("at least 2"));
    }

    #[test]
    fn constant_and_binary_regressors_are_not_standardized() {
        let rows = (0..30)
            .map(|d| (d, vec![Some(d as f64), Some(3.0), Some(if d % 2 == 0 { 1.0 } else { 0.0 })]))
            .collect();
        let ds = dataset(&["y", "c", "b"], rows);
        let sel = RegressorSelection::new(&["c".to_string(), "b".to_string()], &ds, "y").unwrap();
        let fit = fit_model(&ds, "y", &sel, &ModelConfig::default()).unwrap();

        let c = &fit.model.regressors[0];
        assert_eq!((c.mu, c.std), (3.0, 1.0));
        let b = &fit.model.regressors[1];
        assert_eq!((b.mu, b.std), (0.0, 1.0));
        assert!(fit.warnings.iter().any(|w| w.contains("`c`")));
    }
}
