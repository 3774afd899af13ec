//! Prediction frame: training dates followed by the horizon, with the
//! regressor values each row is evaluated at.

use chrono::NaiveDate;

use crate::data::RegressorSource;
use crate::domain::{Dataset, ForecastHorizon, RegressorSelection};

/// Training dates plus `horizon` consecutive days after the last one.
pub fn future_frame(history: &[NaiveDate], horizon: ForecastHorizon) -> Vec<NaiveDate> {
    let mut frame = history.to_vec();
    if let Some(&last) = history.last() {
        frame.extend(horizon.dates_after(last));
    }
    frame
}

/// Regressor with no value for some frame dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRegressor {
    pub name: String,
    pub dates: usize,
    pub first: NaiveDate,
}

/// Regressor values per frame row, ordered as the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedFrame {
    pub dates: Vec<NaiveDate>,
    pub regressors: Vec<Vec<Option<f64>>>,
    pub missing: Vec<MissingRegressor>,
}

/// Attach regressor values to every frame row.
///
/// The first `training.len()` rows read from `training` unless the source
/// overrides history; the remaining rows always read from `source`.
pub fn attach_regressors(
    frame: Vec<NaiveDate>,
    training: &Dataset,
    selection: &RegressorSelection,
    source: &dyn RegressorSource,
) -> AttachedFrame {
    let history_len = training.len();
    let use_source_for_history = source.overrides_history();

    let regressors: Vec<Vec<Option<f64>>> = frame
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            selection
                .names()
                .iter()
                .map(|name| {
                    if i < history_len && !use_source_for_history {
                        training.value(i, name)
                    } else {
                        source.value(name, i, date)
                    }
                })
                .collect()
        })
        .collect();

    let missing = selection
        .names()
        .iter()
        .enumerate()
        .filter_map(|(j, name)| {
            let absent: Vec<NaiveDate> = frame
                .iter()
                .zip(&regressors)
                .skip(history_len)
                .filter(|(_, row)| row[j].is_none())
                .map(|(&d, _)| d)
                .collect();
            absent.first().map(|&first| MissingRegressor {
                name: name.clone(),
                dates: absent.len(),
                first,
            })
        })
        .collect();

    AttachedFrame {
        dates: frame,
        regressors,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::*;
    use crate::data::{DatasetRegressors, SyntheticRegressors};
    use crate::domain::TimeSeriesRecord;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    fn dataset(days: i64) -> Dataset {
        let records = (0..days)
            .map(|i| TimeSeriesRecord {
                ds: day(i),
                values: vec![Some(i as f64), Some(10.0 * i as f64)],
            })
            .collect();
        Dataset::new(vec!["y".into(), "x".into()], records, BTreeSet::new()).unwrap()
    }

    #[test]
    fn history_uses_training_and_future_uses_source() {
        let full = dataset(12);
        let training = dataset(10);
        let sel = RegressorSelection::new(&["x".to_string()], &training, "y").unwrap();
        let frame = future_frame(&training.dates(), ForecastHorizon::new(4).unwrap());
        let attached = attach_regressors(frame, &training, &sel, &DatasetRegressors::new(&full));

        assert_eq!(attached.dates.len(), 14);
        assert_eq!(attached.regressors[3], vec![Some(30.0)]);
        assert_eq!(attached.regressors[11], vec![Some(110.0)]);
        assert_eq!(attached.regressors[12], vec![None]);
        assert_eq!(
            attached.missing,
            vec![MissingRegressor { name: "x".into(), dates: 2, first: day(12) }]
        );
    }

    #[test]
    fn synthetic_source_replaces_history_values() {
        let training = dataset(5);
        let sel = RegressorSelection::new(&["x".to_string()], &training, "y").unwrap();
        let frame = future_frame(&training.dates(), ForecastHorizon::new(3).unwrap());
        let synth = SyntheticRegressors::new(frame.len(), 1).unwrap();
        // "x" is not a synthetic column, so every row comes back empty.
        let attached = attach_regressors(frame, &training, &sel, &synth);
        assert!(attached.regressors.iter().all(|r| r[0].is_none()));
        assert_eq!(attached.missing[0].dates, 3);
    }

    proptest! {
        #[test]
        fn frame_adds_exactly_horizon_consecutive_days(n in 1i64..60, h in 1u32..=365) {
            let history: Vec<NaiveDate> = (0..n).map(|i| day(2 * i)).collect();
            let frame = future_frame(&history, ForecastHorizon::new(h).unwrap());
            prop_assert_eq!(frame.len(), n as usize + h as usize);
            let last = *history.last().unwrap();
            for (k, d) in frame[n as usize..].iter().enumerate() {
                prop_assert_eq!(*d, last + chrono::Duration::days(k as i64 + 1));
            }
            prop_assert!(frame.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
