//! Where regressor values for the prediction frame come from.
//!
//! History rows always read their regressors from the training dataset. Dates
//! beyond the training window need another supplier: either the user's own CSV
//! (rows after the selected window) or the demo synthesizer.

use chrono::NaiveDate;

use crate::domain::Dataset;

/// Supplier of regressor values for dates after the training window.
pub trait RegressorSource {
    /// Value of regressor `name` for the frame row at `index` (0-based over the
    /// whole history + horizon frame), dated `date`. `None` = not available.
    fn value(&self, name: &str, index: usize, date: NaiveDate) -> Option<f64>;

    /// Whether this source also replaces the history rows' regressor values
    /// when predicting (the fit itself always uses the dataset).
    fn overrides_history(&self) -> bool {
        false
    }
}

/// Reads future regressor values from dataset rows with matching dates.
#[derive(Debug, Clone, Copy)]
pub struct DatasetRegressors<'a> {
    dataset: &'a Dataset,
}

impl<'a> DatasetRegressors<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self { dataset }
    }
}

impl RegressorSource for DatasetRegressors<'_> {
    fn value(&self, name: &str, _index: usize, date: NaiveDate) -> Option<f64> {
        self.dataset.value_at(date, name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::TimeSeriesRecord;

    #[test]
    fn dataset_source_matches_by_date() {
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let ds = Dataset::new(
            vec!["x".into()],
            vec![TimeSeriesRecord { ds: d1, values: vec![Some(4.0)] }],
            BTreeSet::new(),
        )
        .unwrap();

        let src = DatasetRegressors::new(&ds);
        assert_eq!(src.value("x", 99, d1), Some(4.0));
        assert_eq!(src.value("x", 0, d2), None);
        assert_eq!(src.value("missing", 0, d1), None);
        assert!(!src.overrides_history());
    }
}
