//! Model fitting.
//!
//! Responsibilities:
//!
//! - place trend changepoints over the training history
//! - fit the additive model (MAP via reweighted ridge least squares)
//! - simulate uncertainty intervals for the prediction frame

pub mod changepoints;
pub mod fitter;
pub mod uncertainty;

pub use changepoints::*;
pub use fitter::*;
pub use uncertainty::*;
