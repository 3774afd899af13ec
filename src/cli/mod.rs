//! Command-line parsing for the `demand` forecasting tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "demand", version, about = "Additive demand forecasting (sales / customers)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Forecast one target column of a CSV and print the summary, tail table, and plot.
    Forecast(ForecastArgs),
    /// Run the fixed demo: enrich both demo targets and forecast them with
    /// fabricated future regressors.
    Demo(DemoArgs),
    /// Write a flat demo base CSV (targets plus the three demo regressors).
    Generate(GenerateArgs),
    /// Launch the interactive dashboard.
    ///
    /// Uses the same pipeline as `demand forecast`, re-run on each trigger.
    Tui(TuiArgs),
}

/// Model hyperparameters settable from the command line.
///
/// Unset flags fall back to the config file, then to built-in defaults.
#[derive(Debug, Args, Clone, Default)]
pub struct ModelArgs {
    /// Trend flexibility (scale of the changepoint prior).
    #[arg(long)]
    pub changepoint_prior_scale: Option<f64>,

    /// Seasonality flexibility (scale of the Fourier prior).
    #[arg(long)]
    pub seasonality_prior_scale: Option<f64>,

    /// Number of potential trend changepoints.
    #[arg(long)]
    pub n_changepoints: Option<usize>,

    /// Fourier order of the weekly seasonality (0 disables it).
    #[arg(long)]
    pub weekly_order: Option<usize>,

    /// Enable the yearly seasonality.
    #[arg(long)]
    pub yearly: bool,

    /// Enable the daily seasonality (no effect on one-row-per-day data).
    #[arg(long)]
    pub daily: bool,

    /// Coverage of the uncertainty band, in (0, 1).
    #[arg(long)]
    pub interval_width: Option<f64>,

    /// Simulated paths for the band (0 collapses it onto the forecast).
    #[arg(long)]
    pub uncertainty_samples: Option<usize>,

    /// Seed for the band simulation.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Options for a single forecast run.
#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Input CSV (a `ds` column plus numeric columns). Prompted for when omitted.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Column to forecast.
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Comma-separated regressor columns.
    #[arg(short = 'r', long, value_delimiter = ',')]
    pub regressors: Vec<String>,

    /// First training date (inclusive, YYYY-MM-DD). Defaults to the first row.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last training date (inclusive, YYYY-MM-DD). Defaults to the last row.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Days to forecast after the training window (1-365).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=365))]
    pub horizon: Option<u32>,

    /// TOML config with `[model]` / `[run]` tables (falls back to `DEMAND_CONFIG`).
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Extra history rows shown before the horizon in the tail table.
    #[arg(long)]
    pub table_margin: Option<usize>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the forecast to CSV (ds,yhat,yhat_lower,yhat_upper).
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the forecast chart (.png or .svg).
    #[arg(long = "export-chart", value_name = "IMAGE")]
    pub export_chart: Option<PathBuf>,

    /// Export the components chart (.png or .svg).
    #[arg(long = "export-components", value_name = "IMAGE")]
    pub export_components: Option<PathBuf>,
}

/// Options for the demo run.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Base CSV with flat targets and the demo regressors. Generated when omitted.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Days to forecast after the history (1-365).
    #[arg(long, default_value_t = crate::app::pipeline::DEMO_HORIZON,
          value_parser = clap::value_parser!(u32).range(1..=365))]
    pub horizon: u32,

    /// Seed for the target noise and the fabricated regressors.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export each target's forecast to CSV; the target name is appended to the stem.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the overlay chart of both targets (.png or .svg).
    #[arg(long = "export-chart", value_name = "IMAGE")]
    pub export_chart: Option<PathBuf>,

    /// Export the primary target's components chart (.png or .svg).
    #[arg(long = "export-components", value_name = "IMAGE")]
    pub export_components: Option<PathBuf>,
}

/// Options for writing a demo base dataset.
#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of consecutive days.
    #[arg(long, default_value_t = 500)]
    pub days: usize,

    /// First date (YYYY-MM-DD).
    #[arg(long, default_value = "2023-01-01")]
    pub start: NaiveDate,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for the dashboard.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// Input CSV. Prompted for when omitted.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Initially selected target (defaults to the first numeric column).
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Initially selected regressors.
    #[arg(short = 'r', long, value_delimiter = ',')]
    pub regressors: Vec<String>,

    /// Initial horizon (1-365).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=365))]
    pub horizon: Option<u32>,

    /// TOML config with `[model]` / `[run]` tables (falls back to `DEMAND_CONFIG`).
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn forecast_flags_parse() {
        let cli = parse(&[
            "demand", "forecast", "-i", "data.csv", "-t", "y_vendite", "-r", "meteo_temp,festivo",
            "--start", "2023-02-01", "--horizon", "30", "--yearly", "--no-plot",
        ]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.target.as_deref(), Some("y_vendite"));
        assert_eq!(args.regressors, vec!["meteo_temp".to_string(), "festivo".to_string()]);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2023, 2, 1));
        assert_eq!(args.horizon, Some(30));
        assert!(args.model.yearly);
        assert!(args.no_plot);
    }

    #[test]
    fn horizon_outside_slider_range_is_rejected() {
        assert!(Cli::try_parse_from(["demand", "forecast", "--horizon", "0"]).is_err());
        assert!(Cli::try_parse_from(["demand", "forecast", "--horizon", "366"]).is_err());
    }

    #[test]
    fn demo_defaults() {
        let Command::Demo(args) = parse(&["demand", "demo"]).command else {
            panic!("expected demo");
        };
        assert_eq!(args.horizon, 100);
        assert!(args.input.is_none());
    }
}
