//! `demand-forecast` library crate.
//!
//! The binary (`demand`) is a thin wrapper around this library so that:
//!
//! - the forecast pipeline is testable without spawning processes
//! - the CLI, the dashboard, and the demo share one orchestrator
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
