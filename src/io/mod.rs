//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - forecast / dataset CSV exports (`export`)
//! - TOML configuration file (`config`)

pub mod config;
pub mod export;
pub mod ingest;

pub use config::*;
pub use export::*;
pub use ingest::*;
