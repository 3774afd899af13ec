//! Additive time-series model: design layout, evaluation, prediction frame.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over which components are enabled.

pub mod frame;
pub mod model;

pub use frame::*;
pub use model::*;
