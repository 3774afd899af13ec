//! Synthetic demo data.
//!
//! The demo dataset is deliberately flat. To make the demo charts look like real
//! shop data, targets get a linear ramp, a weekly sinusoid, and Gaussian noise on
//! top of their raw values, and the horizon gets fabricated regressor paths
//! (cyclic ad spend, seasonal temperature, a holiday every 10th day).
//!
//! None of this is used when a real file with its own future regressors is loaded.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::regressors::RegressorSource;
use crate::domain::{Dataset, TimeSeriesRecord};
use crate::error::AppError;

pub const ADS_COLUMN: &str = "ads_tiktok";
pub const METEO_COLUMN: &str = "meteo_temp";
pub const HOLIDAY_COLUMN: &str = "festivo";

/// Regressors the demo registers for every target, in registration order.
pub const DEMO_REGRESSORS: [&str; 3] = [METEO_COLUMN, ADS_COLUMN, HOLIDAY_COLUMN];

/// Enrichment applied to one demo target column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoTarget {
    pub column: &'static str,
    /// The linear ramp goes from 0 on the first row to this value on the last.
    pub trend_top: f64,
    pub weekly_amplitude: f64,
    pub noise_sigma: f64,
}

/// Sales.
pub const PRIMARY_TARGET: DemoTarget = DemoTarget {
    column: "y_vendite",
    trend_top: 1000.0,
    weekly_amplitude: 700.0,
    noise_sigma: 350.0,
};

/// Customer count.
pub const SECONDARY_TARGET: DemoTarget = DemoTarget {
    column: "y_clienti",
    trend_top: 100.0,
    weekly_amplitude: 30.0,
    noise_sigma: 20.0,
};

/// Linear ramp value at row `i` of `n`, from 0 to `top` inclusive.
pub fn trend_component(i: usize, n: usize, top: f64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    top * i as f64 / (n - 1) as f64
}

/// Weekly sinusoid keyed to the day of week (Monday = 0).
pub fn weekly_component(date: NaiveDate, amplitude: f64) -> f64 {
    let dow = f64::from(date.weekday().num_days_from_monday());
    amplitude * (2.0 * PI * dow / 7.0).sin()
}

/// Add trend, weekly seasonality, and noise to each target column.
///
/// Deterministic for a fixed `seed`. Missing raw values stay missing.
pub fn enrich_targets(dataset: &Dataset, targets: &[DemoTarget], seed: u64) -> Result<Dataset, AppError> {
    let n = dataset.len();
    let dates = dataset.dates();
    let mut out = dataset.clone();

    for target in targets {
        let raw = dataset
            .series(target.column)
            .ok_or_else(|| AppError::schema(format!("Missing required column(s): {}", target.column)))?;

        let mut rng = stream_rng(seed, target.column);
        let noise = Normal::new(0.0, target.noise_sigma)
            .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

        let values = raw
            .iter()
            .zip(&dates)
            .enumerate()
            .map(|(i, (v, &date))| {
                // Draw for every row so the noise stream does not depend on gaps.
                let eps = noise.sample(&mut rng);
                v.map(|v| {
                    (v + trend_component(i, n, target.trend_top)
                        + weekly_component(date, target.weekly_amplitude)
                        + eps)
                        .round()
                })
            })
            .collect();

        out = out.with_column(target.column, values)?;
    }

    Ok(out)
}

/// Multipliers applied to the primary target's fabricated regressors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressorFactors {
    pub ads: f64,
    pub meteo: f64,
    pub holiday: f64,
}

/// Demo-only coupling: the secondary target's future regressors are fixed
/// multiples of the primary's. Real datasets supply each target's regressors
/// independently.
pub const SECONDARY_FACTORS: RegressorFactors = RegressorFactors {
    ads: 3.0,
    meteo: 5.0,
    holiday: 3.0,
};

/// Fabricated regressor paths indexed by frame row.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRegressors {
    ads: Vec<f64>,
    meteo: Vec<f64>,
    holiday: Vec<f64>,
}

impl SyntheticRegressors {
    /// Paths for a frame of `frame_len` rows (history + horizon).
    ///
    /// - ads: `75 + 150 * |sin(2πd/20)|`
    /// - temperature: `15 + 15 * sin(2πd/90) + N(0, 2)`
    /// - holiday: 1 on every 10th row
    pub fn new(frame_len: usize, seed: u64) -> Result<Self, AppError> {
        let mut rng = stream_rng(seed, METEO_COLUMN);
        let noise = Normal::new(0.0, 2.0)
            .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

        let mut ads = Vec::with_capacity(frame_len);
        let mut meteo = Vec::with_capacity(frame_len);
        let mut holiday = Vec::with_capacity(frame_len);

        for d in 0..frame_len {
            let x = d as f64;
            ads.push(75.0 + 150.0 * (2.0 * PI * x / 20.0).sin().abs());
            meteo.push(15.0 + 15.0 * (2.0 * PI * x / 90.0).sin() + noise.sample(&mut rng));
            holiday.push(if d % 10 == 0 { 1.0 } else { 0.0 });
        }

        Ok(Self { ads, meteo, holiday })
    }

    pub fn scaled(&self, factors: RegressorFactors) -> Self {
        let scale = |v: &[f64], k: f64| v.iter().map(|x| x * k).collect();
        Self {
            ads: scale(&self.ads, factors.ads),
            meteo: scale(&self.meteo, factors.meteo),
            holiday: scale(&self.holiday, factors.holiday),
        }
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}

impl RegressorSource for SyntheticRegressors {
    fn value(&self, name: &str, index: usize, _date: NaiveDate) -> Option<f64> {
        match name {
            ADS_COLUMN => self.ads.get(index).copied(),
            METEO_COLUMN => self.meteo.get(index).copied(),
            HOLIDAY_COLUMN => self.holiday.get(index).copied(),
            _ => None,
        }
    }

    fn overrides_history(&self) -> bool {
        true
    }
}

/// Flat base dataset for the demo when no file is provided.
///
/// Targets are a constant level plus regressor effects and mild noise; the
/// visible shape comes from `enrich_targets`.
pub fn flat_dataset(start: NaiveDate, days: usize, seed: u64) -> Result<Dataset, AppError> {
    if days == 0 {
        return Err(AppError::config("Demo dataset needs at least one day."));
    }

    let mut rng = stream_rng(seed, "flat");
    let temp_noise = Normal::new(0.0, 2.0)
        .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;
    let sales_noise = Normal::new(0.0, 150.0)
        .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;
    let customer_noise = Normal::new(0.0, 10.0)
        .map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

    let columns: Vec<String> = [
        PRIMARY_TARGET.column,
        SECONDARY_TARGET.column,
        METEO_COLUMN,
        ADS_COLUMN,
        HOLIDAY_COLUMN,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut records = Vec::with_capacity(days);
    for d in 0..days {
        let ds = start
            .checked_add_signed(Duration::days(d as i64))
            .ok_or_else(|| AppError::config("Demo date range overflows the calendar."))?;

        let season = (2.0 * PI * f64::from(ds.ordinal()) / 365.25).sin();
        let meteo = (15.0 + 10.0 * season + temp_noise.sample(&mut rng)).round();
        let ads = rng.gen_range(50.0..250.0_f64).round();
        let holiday = if rng.gen_bool(0.05) { 1.0 } else { 0.0 };

        let sales = (5000.0 + 20.0 * meteo + 4.0 * ads + 800.0 * holiday + sales_noise.sample(&mut rng)).round();
        let customers = (200.0 + meteo + 0.2 * ads + 40.0 * holiday + customer_noise.sample(&mut rng)).round();

        records.push(TimeSeriesRecord {
            ds,
            values: vec![Some(sales), Some(customers), Some(meteo), Some(ads), Some(holiday)],
        });
    }

    Dataset::new(columns, records, BTreeSet::new())
}

/// Independent, reproducible RNG stream per (seed, purpose).
fn stream_rng(seed: u64, stream: &str) -> StdRng {
    StdRng::seed_from_u64(seed ^ stream_tag(stream))
}

/// FNV-1a over the stream name; a fixed function, so seeds mean the same
/// thing on every toolchain.
fn stream_tag(stream: &str) -> u64 {
    stream
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_seeds_are_pinned() {
        assert_eq!(stream_tag(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(stream_tag("flat"), 0xd5f2_e179_088c_27fa);
        assert_ne!(stream_tag(METEO_COLUMN), stream_tag("flat"));

        let mut a = stream_rng(42, "flat");
        let mut b = StdRng::seed_from_u64(42 ^ 0xd5f2_e179_088c_27fa);
        assert_eq!(a.next_u64(), b.next_u64());
    }

    fn zeros(days: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(); // a Monday
        let records = (0..days)
            .map(|d| TimeSeriesRecord {
                ds: start + Duration::days(d as i64),
                values: vec![Some(0.0), Some(0.0)],
            })
            .collect();
        Dataset::new(
            vec![PRIMARY_TARGET.column.into(), SECONDARY_TARGET.column.into()],
            records,
            BTreeSet::new(),
        )
        .unwrap()
    }

    #[test]
    fn deterministic_components() {
        assert_eq!(trend_component(0, 5, 1000.0), 0.0);
        assert_eq!(trend_component(4, 5, 1000.0), 1000.0);
        assert_eq!(trend_component(2, 5, 1000.0), 500.0);
        assert_eq!(trend_component(0, 1, 1000.0), 0.0);

        let monday = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        assert_eq!(weekly_component(monday, 700.0), 0.0);
        let tuesday = monday + Duration::days(1);
        let expected = 700.0 * (2.0 * PI / 7.0).sin();
        assert!((weekly_component(tuesday, 700.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn enrichment_is_reproducible_for_a_seed() {
        let ds = zeros(50);
        let targets = [PRIMARY_TARGET, SECONDARY_TARGET];
        let a = enrich_targets(&ds, &targets, 7).unwrap();
        let b = enrich_targets(&ds, &targets, 7).unwrap();
        let c = enrich_targets(&ds, &targets, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn noise_matches_configured_sigma() {
        let n = 6000;
        let ds = zeros(n);
        let dates = ds.dates();

        for target in [PRIMARY_TARGET, SECONDARY_TARGET] {
            let out = enrich_targets(&ds, &[target], 123).unwrap();
            let series = out.series(target.column).unwrap();

            let residuals: Vec<f64> = series
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v.unwrap()
                        - trend_component(i, n, target.trend_top)
                        - weekly_component(dates[i], target.weekly_amplitude)
                })
                .collect();

            let mean = residuals.iter().sum::<f64>() / n as f64;
            let var = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let std = var.sqrt();
            let rel = (std - target.noise_sigma).abs() / target.noise_sigma;
            assert!(rel < 0.05, "{}: std {std:.2} vs sigma {}", target.column, target.noise_sigma);
            assert!(mean.abs() < 4.0 * target.noise_sigma / (n as f64).sqrt() + 0.5);
        }
    }

    #[test]
    fn future_regressor_shapes() {
        let regs = SyntheticRegressors::new(40, 1).unwrap();
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert_eq!(regs.value(ADS_COLUMN, 0, d), Some(75.0));
        assert!((regs.value(ADS_COLUMN, 5, d).unwrap() - 225.0).abs() < 1e-9);
        assert_eq!(regs.value(HOLIDAY_COLUMN, 10, d), Some(1.0));
        assert_eq!(regs.value(HOLIDAY_COLUMN, 11, d), Some(0.0));
        assert_eq!(regs.value(ADS_COLUMN, 40, d), None);
        assert_eq!(regs.value("other", 0, d), None);

        for i in 0..40 {
            let ads = regs.value(ADS_COLUMN, i, d).unwrap();
            assert!((75.0..=225.0 + 1e-9).contains(&ads));
        }
    }

    #[test]
    fn secondary_regressors_are_scaled_copies() {
        let primary = SyntheticRegressors::new(30, 3).unwrap();
        let secondary = primary.scaled(SECONDARY_FACTORS);
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..30 {
            let p = |name| primary.value(name, i, d).unwrap();
            let s = |name| secondary.value(name, i, d).unwrap();
            assert!((s(ADS_COLUMN) - 3.0 * p(ADS_COLUMN)).abs() < 1e-9);
            assert!((s(METEO_COLUMN) - 5.0 * p(METEO_COLUMN)).abs() < 1e-9);
            assert!((s(HOLIDAY_COLUMN) - 3.0 * p(HOLIDAY_COLUMN)).abs() < 1e-9);
        }
    }

    #[test]
    fn flat_dataset_has_demo_columns() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let ds = flat_dataset(start, 30, 9).unwrap();
        assert_eq!(ds.len(), 30);
        for col in DEMO_REGRESSORS.iter().chain(&[PRIMARY_TARGET.column, SECONDARY_TARGET.column]) {
            assert!(ds.column_index(col).is_some(), "{col}");
        }
        assert_eq!(ds, flat_dataset(start, 30, 9).unwrap());
    }
}
