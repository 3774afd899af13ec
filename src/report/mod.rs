//! Reporting utilities: the forecast tail table and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

pub mod format;
pub mod table;

pub use format::*;
pub use table::*;
