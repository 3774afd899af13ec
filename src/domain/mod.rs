//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the loaded history (`Dataset`, `TimeSeriesRecord`)
//! - run parameters (`TrainingWindow`, `RegressorSelection`, `ForecastHorizon`, `ModelConfig`)
//! - forecast outputs (`ForecastResult`, `ForecastPoint`, `ComponentSeries`)

pub mod types;

pub use types::*;
