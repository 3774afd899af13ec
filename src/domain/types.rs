//! Shared domain types.
//!
//! These types are kept small and plain so they can be:
//!
//! - validated once at ingest and then trusted by the pipeline
//! - passed unchanged between the CLI and the TUI front-ends
//! - exported to CSV / rendered as charts without extra conversion

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name of the date column every input file must carry.
pub const DATE_COLUMN: &str = "ds";

/// Upper bound of the forecast horizon (days).
pub const MAX_HORIZON: u32 = 365;

/// One row of the loaded CSV.
///
/// `values` is aligned with `Dataset::columns()`; empty or unparseable cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    pub ds: NaiveDate,
    pub values: Vec<Option<f64>>,
}

/// Daily history sorted by date, with unique dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<TimeSeriesRecord>,
    non_numeric: BTreeSet<String>,
}

impl Dataset {
    /// Build a dataset, sorting records by date.
    ///
    /// Fails with a schema error on duplicate dates or on rows whose width does
    /// not match the column list.
    pub fn new(
        columns: Vec<String>,
        mut records: Vec<TimeSeriesRecord>,
        non_numeric: BTreeSet<String>,
    ) -> Result<Self, AppError> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != columns.len()) {
            return Err(AppError::schema(format!(
                "Row for {} has {} values, expected {}.",
                bad.ds,
                bad.values.len(),
                columns.len()
            )));
        }

        records.sort_by_key(|r| r.ds);
        if let Some(w) = records.windows(2).find(|w| w[0].ds == w[1].ds) {
            return Err(AppError::schema(format!("Duplicate date in `{DATE_COLUMN}`: {}", w[0].ds)));
        }

        Ok(Self {
            columns,
            records,
            non_numeric,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == DATE_COLUMN || self.column_index(name).is_some()
    }

    /// `false` when at least one non-empty cell of the column failed to parse.
    pub fn is_numeric(&self, name: &str) -> bool {
        !self.non_numeric.contains(name)
    }

    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.records.get(row)?.values[idx]
    }

    /// Value of `name` on `date`, if the date is present.
    pub fn value_at(&self, date: NaiveDate, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        let row = self.records.binary_search_by_key(&date, |r| r.ds).ok()?;
        self.records[row].values[idx]
    }

    pub fn series(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.records.iter().map(|r| r.values[idx]).collect())
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.ds).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.ds)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.ds)
    }

    /// Columns other than the date column, in file order.
    pub fn value_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Replace (or append) a column. `values` must have one entry per record.
    pub fn with_column(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self, AppError> {
        if values.len() != self.records.len() {
            return Err(AppError::schema(format!(
                "Column `{name}` has {} values, expected {}.",
                values.len(),
                self.records.len()
            )));
        }

        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for (r, v) in out.records.iter_mut().zip(values) {
                    r.values[idx] = v;
                }
            }
            None => {
                out.columns.push(name.to_string());
                for (r, v) in out.records.iter_mut().zip(values) {
                    r.values.push(v);
                }
            }
        }
        out.non_numeric.remove(name);
        Ok(out)
    }

    /// Same columns, subset of records (already sorted and unique).
    pub(crate) fn with_records(&self, records: Vec<TimeSeriesRecord>) -> Self {
        Self {
            columns: self.columns.clone(),
            records,
            non_numeric: self.non_numeric.clone(),
        }
    }
}

/// Inclusive `[start, end]` training range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TrainingWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::range(format!(
                "Start date {start} is after end date {end}."
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the whole dataset.
    pub fn full(dataset: &Dataset) -> Result<Self, AppError> {
        Self::resolve(dataset, None, None)
    }

    /// Fill unspecified bounds from the dataset's first/last date.
    pub fn resolve(
        dataset: &Dataset,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, AppError> {
        let (Some(first), Some(last)) = (dataset.first_date(), dataset.last_date()) else {
            return Err(AppError::range("Dataset is empty; no date range to select."));
        };
        Self::new(start.unwrap_or(first), end.unwrap_or(last))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Number of future days to predict, `1..=MAX_HORIZON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastHorizon(u32);

impl ForecastHorizon {
    pub fn new(days: u32) -> Result<Self, AppError> {
        if days == 0 || days > MAX_HORIZON {
            return Err(AppError::config(format!(
                "Forecast horizon must be between 1 and {MAX_HORIZON} days (got {days})."
            )));
        }
        Ok(Self(days))
    }

    pub fn days(self) -> u32 {
        self.0
    }

    /// The `h` dates following `last`, one day apart.
    pub fn dates_after(self, last: NaiveDate) -> Vec<NaiveDate> {
        (1..=i64::from(self.0))
            .filter_map(|d| last.checked_add_signed(Duration::days(d)))
            .collect()
    }
}

/// Covariates registered with the model, validated against the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegressorSelection(Vec<String>);

impl RegressorSelection {
    pub fn new(names: &[String], dataset: &Dataset, target: &str) -> Result<Self, AppError> {
        let mut out: Vec<String> = Vec::with_capacity(names.len());
        let mut missing = BTreeSet::new();

        for name in names {
            if name == DATE_COLUMN || name == target {
                return Err(AppError::config(format!(
                    "`{name}` cannot be used as a regressor for target `{target}`."
                )));
            }
            if dataset.column_index(name).is_none() {
                missing.insert(name.clone());
                continue;
            }
            if !out.contains(name) {
                out.push(name.clone());
            }
        }

        if !missing.is_empty() {
            let list: Vec<&str> = missing.iter().map(String::as_str).collect();
            return Err(AppError::schema(format!(
                "Unknown regressor column(s): {}",
                list.join(", ")
            )));
        }

        Ok(Self(out))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Model hyperparameters.
///
/// Loadable from the `[model]` table of a TOML config; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Laplace scale on trend changes; larger = more flexible trend.
    pub changepoint_prior_scale: f64,
    /// Gaussian prior scale on Fourier coefficients.
    pub seasonality_prior_scale: f64,
    /// Gaussian prior scale on (standardized) regressor coefficients.
    pub regressor_prior_scale: f64,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    /// Fourier order of the period-7 term (0 disables it).
    pub weekly_order: usize,
    pub yearly_seasonality: bool,
    pub daily_seasonality: bool,
    /// Coverage of the uncertainty band, in `(0, 1)`.
    pub interval_width: f64,
    /// Simulated paths per run; 0 disables the band.
    pub uncertainty_samples: usize,
    pub seed: u64,
    /// Reweighting passes of the changepoint prior.
    pub fit_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            regressor_prior_scale: 10.0,
            n_changepoints: 25,
            changepoint_range: 0.8,
            weekly_order: 3,
            yearly_seasonality: false,
            daily_seasonality: false,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 42,
            fit_iterations: 10,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.changepoint_prior_scale) {
            return Err(AppError::config("changepoint_prior_scale must be > 0."));
        }
        if !positive(self.seasonality_prior_scale) {
            return Err(AppError::config("seasonality_prior_scale must be > 0."));
        }
        if !positive(self.regressor_prior_scale) {
            return Err(AppError::config("regressor_prior_scale must be > 0."));
        }
        if !(self.changepoint_range.is_finite() && self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(AppError::config("changepoint_range must be in (0, 1]."));
        }
        if !(self.interval_width.is_finite() && self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(AppError::config("interval_width must be in (0, 1)."));
        }
        if self.fit_iterations == 0 {
            return Err(AppError::config("fit_iterations must be >= 1."));
        }
        Ok(())
    }
}

/// One output row: point estimate and band. `None` = undefined for that date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub yhat: Option<f64>,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// One additive component of the prediction, aligned with `ForecastResult::rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Fitted values over the training dates followed by the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub target: String,
    /// Last training date; rows after it are extrapolated.
    pub cutoff: NaiveDate,
    pub rows: Vec<ForecastPoint>,
    pub components: Vec<ComponentSeries>,
}

impl ForecastResult {
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.ds).collect()
    }

    pub fn future_rows(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.rows.iter().filter(move |r| r.ds > self.cutoff)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSeries> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags, an optional config file, and defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub target: String,
    pub regressors: Vec<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub horizon: u32,
    pub model: ModelConfig,

    /// Extra history rows shown before the horizon in the tail table.
    pub table_margin: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_csv: Option<PathBuf>,
    pub export_chart: Option<PathBuf>,
    pub export_components: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn dataset(days: &[u32]) -> Dataset {
        let records = days
            .iter()
            .map(|&d| TimeSeriesRecord {
                ds: day(d),
                values: vec![Some(d as f64), Some(1.0)],
            })
            .collect();
        Dataset::new(vec!["y".into(), "x".into()], records, BTreeSet::new()).unwrap()
    }

    #[test]
    fn dataset_sorts_and_rejects_duplicates() {
        let ds = dataset(&[3, 1, 2]);
        assert_eq!(ds.dates(), vec![day(1), day(2), day(3)]);
        assert_eq!(ds.value_at(day(2), "y"), Some(2.0));

        let dup = vec![
            TimeSeriesRecord { ds: day(1), values: vec![None] },
            TimeSeriesRecord { ds: day(1), values: vec![None] },
        ];
        let err = Dataset::new(vec!["y".into()], dup, BTreeSet::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Schema);
    }

    #[test]
    fn window_rejects_inverted_range() {
        let err = TrainingWindow::new(day(5), day(1)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Range);
        assert!(TrainingWindow::new(day(1), day(1)).is_ok());
    }

    #[test]
    fn horizon_bounds_and_dates() {
        assert!(ForecastHorizon::new(0).is_err());
        assert!(ForecastHorizon::new(366).is_err());
        let h = ForecastHorizon::new(3).unwrap();
        assert_eq!(h.dates_after(day(30)), vec![day(31), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()]);
    }

    #[test]
    fn regressor_selection_validates_names() {
        let ds = dataset(&[1, 2]);
        let sel = RegressorSelection::new(&["x".into(), "x".into()], &ds, "y").unwrap();
        assert_eq!(sel.names(), ["x".to_string()]);

        let err = RegressorSelection::new(&["nope".into()], &ds, "y").unwrap_err();
        assert!(err.message().contains("nope"));
        assert!(RegressorSelection::new(&["y".into()], &ds, "y").is_err());
    }

    #[test]
    fn with_column_replaces_values() {
        let ds = dataset(&[1, 2]);
        let out = ds.with_column("y", vec![Some(10.0), None]).unwrap();
        assert_eq!(out.value(0, "y"), Some(10.0));
        assert_eq!(out.value(1, "y"), None);
        assert!(ds.with_column("y", vec![None]).is_err());
    }
}
