//! Chart rendering: terminal ASCII plots and PNG/SVG exports.

pub mod ascii;
pub mod chart;

pub use ascii::*;
pub use chart::*;
