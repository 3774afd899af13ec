//! Additive model evaluation.
//!
//! ```text
//! y(d) = trend(t) + Σ seasonality_s(d) + Σ β_r · x̃_r(d)
//! trend(t) = m + k·t + Σ δ_j (t - s_j)+
//! ```
//!
//! with `t` the date rescaled so the training window maps to `[0, 1]`, `d` the
//! day count since 1970-01-01, and `x̃_r` the standardized regressor. All
//! coefficients live in the scaled target space (`y / y_scale`).
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given date and regressor vector (for least squares)
//! - predict each additive component for a date (for outputs and charts)

use std::ops::Range;

use chrono::NaiveDate;

use crate::domain::ModelConfig;
use crate::math::{epoch_days, fourier_row, hinge};

/// A Fourier seasonality term.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    /// Period in days.
    pub period: f64,
    pub order: usize,
}

const WEEKLY_PERIOD: f64 = 7.0;
const YEARLY_PERIOD: f64 = 365.25;
const YEARLY_ORDER: usize = 10;
const DAILY_PERIOD: f64 = 1.0;
const DAILY_ORDER: usize = 4;

/// Seasonality terms enabled by the configuration.
pub fn seasonalities(config: &ModelConfig) -> Vec<Seasonality> {
    let mut out = Vec::new();
    if config.weekly_order > 0 {
        out.push(Seasonality {
            name: "weekly",
            period: WEEKLY_PERIOD,
            order: config.weekly_order,
        });
    }
    if config.yearly_seasonality {
        out.push(Seasonality {
            name: "yearly",
            period: YEARLY_PERIOD,
            order: YEARLY_ORDER,
        });
    }
    if config.daily_seasonality {
        out.push(Seasonality {
            name: "daily",
            period: DAILY_PERIOD,
            order: DAILY_ORDER,
        });
    }
    out
}

/// How a regressor is rescaled before entering the design matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressorScaling {
    pub name: String,
    pub mu: f64,
    pub std: f64,
}

impl RegressorScaling {
    pub fn apply(&self, x: f64) -> f64 {
        (x - self.mu) / self.std
    }
}

/// Maps dates to the model's time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    /// Epoch day of the first training date.
    pub day0: f64,
    /// Days between the first and last training date (>= 1).
    pub span: f64,
}

impl TimeScale {
    pub fn t(&self, date: NaiveDate) -> f64 {
        (epoch_days(date) - self.day0) / self.span
    }
}

/// Column layout of the design matrix:
/// `[m, k, δ_1..δ_C, fourier(s_1).., fourier(s_S).., β_1..β_R]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub n_changepoints: usize,
    pub seasonalities: Vec<Seasonality>,
    pub n_regressors: usize,
}

impl Layout {
    pub fn width(&self) -> usize {
        self.regressor_range().end
    }

    pub fn delta_range(&self) -> Range<usize> {
        2..2 + self.n_changepoints
    }

    /// Columns of seasonality `i`.
    pub fn seasonality_range(&self, i: usize) -> Range<usize> {
        let start = self.delta_range().end
            + self.seasonalities[..i].iter().map(|s| 2 * s.order).sum::<usize>();
        start..start + 2 * self.seasonalities[i].order
    }

    pub fn regressor_range(&self) -> Range<usize> {
        let start = self.delta_range().end + self.seasonalities.iter().map(|s| 2 * s.order).sum::<usize>();
        start..start + self.n_regressors
    }
}

/// Fill a design row for one observation.
///
/// `x_scaled` holds the already standardized regressor values.
///
/// # Panics
/// Panics if `out.len() != layout.width()`, `changepoints.len() !=
/// layout.n_changepoints`, or `x_scaled.len() != layout.n_regressors`.
pub fn fill_design_row(
    layout: &Layout,
    changepoints: &[f64],
    t: f64,
    day: f64,
    x_scaled: &[f64],
    out: &mut [f64],
) {
    out[0] = 1.0;
    out[1] = t;
    for (col, &s) in layout.delta_range().zip(changepoints) {
        out[col] = hinge(t, s);
    }
    for (i, season) in layout.seasonalities.iter().enumerate() {
        let range = layout.seasonality_range(i);
        fourier_row(day, season.period, season.order, &mut out[range]);
    }
    for (col, &x) in layout.regressor_range().zip(x_scaled) {
        out[col] = x;
    }
}

/// Per-date decomposition, in target units.
#[derive(Debug, Clone, PartialEq)]
pub struct RowPrediction {
    pub trend: f64,
    /// One entry per `Layout::seasonalities`.
    pub seasonal: Vec<f64>,
    /// One entry per regressor; `None` when its value is missing for this date.
    pub regressors: Vec<Option<f64>>,
}

impl RowPrediction {
    /// Sum of regressor effects; `None` if any regressor is missing.
    pub fn regressor_total(&self) -> Option<f64> {
        self.regressors.iter().copied().sum()
    }

    /// Point estimate; undefined if any regressor is missing.
    pub fn yhat(&self) -> Option<f64> {
        let seasonal: f64 = self.seasonal.iter().sum();
        self.regressor_total().map(|r| self.trend + seasonal + r)
    }
}

/// Fitted parameters and scaling metadata for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub target: String,
    pub layout: Layout,
    pub time: TimeScale,
    pub y_scale: f64,
    /// Changepoint locations on the scaled time axis.
    pub changepoints: Vec<f64>,
    pub regressors: Vec<RegressorScaling>,
    /// Coefficients in scaled target space, ordered as `layout`.
    pub beta: Vec<f64>,
    /// Residual standard deviation in scaled target space.
    pub sigma_obs: f64,
    /// Last training date.
    pub cutoff: NaiveDate,
}

impl FittedModel {
    pub fn deltas(&self) -> &[f64] {
        &self.beta[self.layout.delta_range()]
    }

    /// Trend in scaled target space.
    pub fn trend_scaled(&self, t: f64) -> f64 {
        let mut y = self.beta[0] + self.beta[1] * t;
        for (&d, &s) in self.deltas().iter().zip(&self.changepoints) {
            y += d * hinge(t, s);
        }
        y
    }

    /// Decompose the prediction for `date` given raw regressor values.
    pub fn predict(&self, date: NaiveDate, raw_regressors: &[Option<f64>]) -> RowPrediction {
        let day = epoch_days(date);
        let trend = self.trend_scaled(self.time.t(date)) * self.y_scale;

        let seasonal = self
            .layout
            .seasonalities
            .iter()
            .enumerate()
            .map(|(i, season)| {
                let range = self.layout.seasonality_range(i);
                let mut row = vec![0.0; range.len()];
                fourier_row(day, season.period, season.order, &mut row);
                row.iter().zip(&self.beta[range]).map(|(x, b)| x * b).sum::<f64>() * self.y_scale
            })
            .collect();

        let regressors = self
            .regressors
            .iter()
            .zip(self.layout.regressor_range())
            .zip(raw_regressors)
            .map(|((scaling, col), raw)| raw.map(|x| scaling.apply(x) * self.beta[col] * self.y_scale))
            .collect();

        RowPrediction {
            trend,
            seasonal,
            regressors,
        }
    }
}
