//! Combined history/forecast table.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Dataset, ForecastResult};

/// Default number of history rows shown before the horizon.
pub const DEFAULT_TABLE_MARGIN: usize = 7;

/// One table row: the actual value (when the dataset has one) next to the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TailRow {
    pub ds: NaiveDate,
    pub actual: Option<f64>,
    pub yhat: Option<f64>,
    pub yhat_lower: Option<f64>,
    pub yhat_upper: Option<f64>,
}

/// Last `horizon + margin` rows of the forecast, joined with actuals by date.
pub fn tail_table(result: &ForecastResult, actuals: &Dataset, horizon: usize, margin: usize) -> Vec<TailRow> {
    let take = horizon.saturating_add(margin).min(result.rows.len());
    result.rows[result.rows.len() - take..]
        .iter()
        .map(|p| TailRow {
            ds: p.ds,
            actual: actuals.value_at(p.ds, &result.target),
            yhat: p.yhat,
            yhat_lower: p.yhat_lower,
            yhat_upper: p.yhat_upper,
        })
        .collect()
}
