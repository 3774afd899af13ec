//! Shared forecast pipeline used by the CLI, the TUI, and the demo.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! filter -> fit -> future frame -> attach regressors -> predict -> intervals
//!
//! The front-ends then only decide where the dataset and the future regressor
//! values come from, and how results are presented.

use std::path::Path;

use tracing::{info, warn};

use crate::data::{
    DEMO_REGRESSORS, DatasetRegressors, PRIMARY_TARGET, RegressorSource, SECONDARY_FACTORS,
    SECONDARY_TARGET, SyntheticRegressors, enrich_targets, filter_range,
};
use crate::domain::{
    ComponentSeries, Dataset, ForecastHorizon, ForecastPoint, ForecastResult, ModelConfig,
    RegressorSelection, RunConfig, TrainingWindow,
};
use crate::error::AppError;
use crate::fit::{fit_model, sample_intervals};
use crate::io::ingest::{load_dataset, required_columns};
use crate::models::{RowPrediction, attach_regressors, future_frame};

/// Everything needed to forecast one target.
#[derive(Debug, Clone)]
pub struct ForecastRequest<'a> {
    pub dataset: &'a Dataset,
    pub target: String,
    pub regressors: Vec<String>,
    pub window: TrainingWindow,
    pub horizon: ForecastHorizon,
    pub model: ModelConfig,
}

/// Outputs of one forecast run.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub result: ForecastResult,
    /// The training window's rows (actuals for tables and charts).
    pub training: Dataset,
    pub regressors: Vec<String>,
    /// Rows the model was fitted on.
    pub observations: usize,
    /// In-sample RMSE in target units.
    pub rmse: f64,
    /// Recoverable issues (e.g. future dates without regressor values).
    pub warnings: Vec<String>,
}

/// Forecast one target.
///
/// History rows take their regressor values from the training data; rows after
/// the window ask `future`. Dates `future` cannot cover get undefined
/// estimates and a warning.
pub fn run_forecast(request: &ForecastRequest<'_>, future: &dyn RegressorSource) -> Result<ForecastRun, AppError> {
    let target = request.target.as_str();
    let training = filter_range(request.dataset, &request.window)?;
    let selection = RegressorSelection::new(&request.regressors, &training, target)?;

    let fit = fit_model(&training, target, &selection, &request.model)?;
    info!(
        column = target,
        rows = fit.observations,
        changepoints = fit.model.changepoints.len(),
        rmse = fit.rmse,
        "fitted model"
    );

    let frame = future_frame(&training.dates(), request.horizon);
    let attached = attach_regressors(frame, &training, &selection, future);

    let mut warnings = fit.warnings.clone();
    for missing in &attached.missing {
        let msg = format!(
            "Regressor `{}` has no value for {} future date(s) from {}; forecasts there are undefined.",
            missing.name, missing.dates, missing.first
        );
        warn!(column = target, regressor = %missing.name, dates = missing.dates, "missing future regressor values");
        warnings.push(msg);
    }

    let predictions: Vec<RowPrediction> = attached
        .dates
        .iter()
        .zip(&attached.regressors)
        .map(|(&date, values)| fit.model.predict(date, values))
        .collect();
    let yhat: Vec<Option<f64>> = predictions.iter().map(RowPrediction::yhat).collect();
    let intervals = sample_intervals(&fit.model, &attached.dates, &yhat, &request.model)?;

    let rows: Vec<ForecastPoint> = attached
        .dates
        .iter()
        .zip(&yhat)
        .zip(&intervals)
        .map(|((&ds, &yhat), band)| ForecastPoint {
            ds,
            yhat,
            yhat_lower: band.lower,
            yhat_upper: band.upper,
        })
        .collect();

    let components = collect_components(&fit.model.layout.seasonalities, selection.names(), &predictions);
    info!(column = target, rows = rows.len(), horizon = request.horizon.days(), "predicted");

    Ok(ForecastRun {
        result: ForecastResult {
            target: target.to_string(),
            cutoff: fit.model.cutoff,
            rows,
            components,
        },
        training,
        regressors: selection.names().to_vec(),
        observations: fit.observations,
        rmse: fit.rmse,
        warnings,
    })
}

fn collect_components(
    seasonalities: &[crate::models::Seasonality],
    regressors: &[String],
    predictions: &[RowPrediction],
) -> Vec<ComponentSeries> {
    let mut out = vec![ComponentSeries {
        name: "trend".to_string(),
        values: predictions.iter().map(|p| Some(p.trend)).collect(),
    }];

    for (i, season) in seasonalities.iter().enumerate() {
        out.push(ComponentSeries {
            name: season.name.to_string(),
            values: predictions.iter().map(|p| Some(p.seasonal[i])).collect(),
        });
    }

    if !regressors.is_empty() {
        out.push(ComponentSeries {
            name: "extra_regressors_additive".to_string(),
            values: predictions.iter().map(RowPrediction::regressor_total).collect(),
        });
        for (j, name) in regressors.iter().enumerate() {
            out.push(ComponentSeries {
                name: name.clone(),
                values: predictions.iter().map(|p| p.regressors[j]).collect(),
            });
        }
    }

    out
}

/// Load the configured CSV and forecast its target.
///
/// Future regressor values come from the same file's rows after the window.
pub fn run_from_config(config: &RunConfig) -> Result<(Dataset, ForecastRun), AppError> {
    let required = required_columns(std::slice::from_ref(&config.target), &config.regressors);
    let dataset = load_dataset(&config.input, &required)?;
    let run = run_on_dataset(&dataset, config)?;
    Ok((dataset, run))
}

/// Forecast on an already loaded dataset using the run parameters in `config`.
pub fn run_on_dataset(dataset: &Dataset, config: &RunConfig) -> Result<ForecastRun, AppError> {
    let request = ForecastRequest {
        dataset,
        target: config.target.clone(),
        regressors: config.regressors.clone(),
        window: TrainingWindow::resolve(dataset, config.start, config.end)?,
        horizon: ForecastHorizon::new(config.horizon)?,
        model: config.model.clone(),
    };
    run_forecast(&request, &DatasetRegressors::new(dataset))
}

/// Fixed demo configuration: both demo targets, the three demo regressors,
/// fabricated future regressor paths.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub base: Dataset,
    pub horizon: ForecastHorizon,
    /// Seeds the target noise and the fabricated regressors.
    pub seed: u64,
    pub model: ModelConfig,
}

/// Default demo horizon in days.
pub const DEMO_HORIZON: u32 = 100;
/// Demo trend flexibility (looser than the default).
pub const DEMO_CHANGEPOINT_PRIOR_SCALE: f64 = 0.3;

impl DemoConfig {
    pub fn new(base: Dataset, seed: u64) -> Result<Self, AppError> {
        Ok(Self {
            base,
            horizon: ForecastHorizon::new(DEMO_HORIZON)?,
            seed,
            model: ModelConfig {
                changepoint_prior_scale: DEMO_CHANGEPOINT_PRIOR_SCALE,
                ..ModelConfig::default()
            },
        })
    }
}

/// Columns a demo base dataset must carry.
pub fn demo_required_columns() -> Vec<String> {
    let targets = [PRIMARY_TARGET.column, SECONDARY_TARGET.column].map(String::from);
    let regressors = DEMO_REGRESSORS.map(String::from);
    required_columns(&targets, &regressors)
}

/// Load a demo base dataset from disk.
pub fn load_demo_base(path: &Path) -> Result<Dataset, AppError> {
    load_dataset(path, &demo_required_columns())
}

/// Demo outputs: the enriched history and one run per demo target.
#[derive(Debug, Clone)]
pub struct DemoRun {
    pub enriched: Dataset,
    pub runs: Vec<ForecastRun>,
}

/// Run the demo: enrich the flat base targets, then forecast both with
/// synthetic future regressors.
pub fn run_demo(config: &DemoConfig) -> Result<DemoRun, AppError> {
    let enriched = enrich_targets(&config.base, &[PRIMARY_TARGET, SECONDARY_TARGET], config.seed)?;
    let window = TrainingWindow::full(&enriched)?;

    let frame_len = enriched.len() + config.horizon.days() as usize;
    let primary_regressors = SyntheticRegressors::new(frame_len, config.seed)?;
    // Demo-only shortcut: the secondary target sees scaled copies of the
    // primary target's regressor paths.
    let secondary_regressors = primary_regressors.scaled(SECONDARY_FACTORS);

    let regressors: Vec<String> = DEMO_REGRESSORS.iter().map(|s| s.to_string()).collect();
    let mut runs = Vec::with_capacity(2);
    for (target, source) in [
        (PRIMARY_TARGET.column, &primary_regressors),
        (SECONDARY_TARGET.column, &secondary_regressors),
    ] {
        let request = ForecastRequest {
            dataset: &enriched,
            target: target.to_string(),
            regressors: regressors.clone(),
            window,
            horizon: config.horizon,
            model: config.model.clone(),
        };
        runs.push(run_forecast(&request, source)?);
    }

    Ok(DemoRun { enriched, runs })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::data::flat_dataset;
    use crate::error::ErrorKind;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    fn assert_bounds_ordered(result: &ForecastResult) {
        for row in &result.rows {
            if let (Some(lo), Some(y), Some(hi)) = (row.yhat_lower, row.yhat, row.yhat_upper) {
                assert!(lo <= y && y <= hi, "{}: {lo} <= {y} <= {hi}", row.ds);
            }
        }
    }

    #[test]
    fn scenario_500_rows_horizon_30() {
        let base = flat_dataset(start(), 500, 7).unwrap();
        let dataset = enrich_targets(&base, &[PRIMARY_TARGET], 7).unwrap();
        let request = ForecastRequest {
            dataset: &dataset,
            target: PRIMARY_TARGET.column.to_string(),
            regressors: DEMO_REGRESSORS.iter().map(|s| s.to_string()).collect(),
            window: TrainingWindow::full(&dataset).unwrap(),
            horizon: ForecastHorizon::new(30).unwrap(),
            model: ModelConfig { uncertainty_samples: 200, ..ModelConfig::default() },
        };
        let synth = SyntheticRegressors::new(530, 7).unwrap();
        let run = run_forecast(&request, &synth).unwrap();

        let rows = &run.result.rows;
        assert_eq!(rows.len(), 530);
        let last_input = dataset.last_date().unwrap();
        for (k, row) in rows[500..].iter().enumerate() {
            assert_eq!(row.ds, last_input + Duration::days(k as i64 + 1));
            assert!(row.yhat.is_some());
        }
        assert_bounds_ordered(&run.result);
        assert!(run.warnings.is_empty());
        assert!(run.result.component("trend").is_some());
        assert!(run.result.component("weekly").is_some());
        assert!(run.result.component("extra_regressors_additive").is_some());
        assert_eq!(run.result.components.len(), 2 + 1 + 3);
    }

    #[test]
    fn file_regressors_cover_future_dates_after_the_window() {
        let dataset = flat_dataset(start(), 120, 3).unwrap();
        let window = TrainingWindow::new(start(), start() + Duration::days(99)).unwrap();
        let request = ForecastRequest {
            dataset: &dataset,
            target: "y_vendite".to_string(),
            regressors: vec!["ads_tiktok".to_string()],
            window,
            horizon: ForecastHorizon::new(30).unwrap(),
            model: ModelConfig { uncertainty_samples: 50, ..ModelConfig::default() },
        };
        let run = run_forecast(&request, &DatasetRegressors::new(&dataset)).unwrap();

        assert_eq!(run.result.rows.len(), 130);
        assert_eq!(run.training.len(), 100);
        assert!(run.result.rows[119].yhat.is_some());
        assert!(run.result.rows[120].yhat.is_none());
        assert!(run.result.rows[120].yhat_lower.is_none());
        assert_eq!(run.warnings.len(), 1);
        assert!(run.warnings[0].contains("10 future date(s)"));
    }

    #[test]
    fn inverted_window_fails_before_fit() {
        let err = TrainingWindow::new(start() + Duration::days(5), start()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn empty_window_is_a_range_error() {
        let dataset = flat_dataset(start(), 30, 1).unwrap();
        let window = TrainingWindow::new(start() + Duration::days(100), start() + Duration::days(110)).unwrap();
        let request = ForecastRequest {
            dataset: &dataset,
            target: "y_vendite".to_string(),
            regressors: Vec::new(),
            window,
            horizon: ForecastHorizon::new(5).unwrap(),
            model: ModelConfig::default(),
        };
        let err = run_forecast(&request, &DatasetRegressors::new(&dataset)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn demo_runs_both_targets() {
        let base = flat_dataset(start(), 200, 11).unwrap();
        let mut config = DemoConfig::new(base, 11).unwrap();
        config.model.uncertainty_samples = 100;
        config.horizon = ForecastHorizon::new(20).unwrap();

        let demo = run_demo(&config).unwrap();
        assert_eq!(demo.runs.len(), 2);
        assert_eq!(demo.runs[0].result.target, "y_vendite");
        assert_eq!(demo.runs[1].result.target, "y_clienti");
        for run in &demo.runs {
            assert_eq!(run.result.rows.len(), 220);
            assert!(run.result.rows.iter().all(|r| r.yhat.is_some()));
            assert_bounds_ordered(&run.result);
        }
    }
}
