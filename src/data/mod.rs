//! Data shaping ahead of the model: training-window filtering, regressor
//! sources for the prediction frame, and the synthetic demo dataset.

pub mod regressors;
pub mod sample;
pub mod window;

pub use regressors::*;
pub use sample::*;
pub use window::*;
