//! Date-range restriction of a loaded dataset.

use crate::domain::{Dataset, TrainingWindow};
use crate::error::AppError;

/// Keep the records whose date lies in the inclusive window.
///
/// An empty result is a range error: the user has to pick another range.
pub fn filter_range(dataset: &Dataset, window: &TrainingWindow) -> Result<Dataset, AppError> {
    let records: Vec<_> = dataset
        .records()
        .iter()
        .filter(|r| window.contains(r.ds))
        .cloned()
        .collect();

    if records.is_empty() {
        return Err(AppError::range(format!(
            "No rows between {} and {} (data covers {} to {}).",
            window.start(),
            window.end(),
            dataset.first_date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            dataset.last_date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        )));
    }

    tracing::debug!(
        start = %window.start(),
        end = %window.end(),
        kept = records.len(),
        of = dataset.len(),
        "filtered training window"
    );
    Ok(dataset.with_records(records))
}
