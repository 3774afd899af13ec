//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (after loading `.env`)
//! - sets up logging
//! - resolves the run configuration (flags over config file over defaults)
//! - runs the forecast pipeline
//! - prints reports/plots and writes optional exports

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, DemoArgs, ForecastArgs, GenerateArgs, ModelArgs, TuiArgs};
use crate::domain::{Dataset, ForecastResult, ModelConfig, RunConfig};
use crate::error::AppError;
use crate::io::ConfigFile;
use crate::plot::{NAVY, OverlaySeries, PALETTE};
use crate::report::DEFAULT_TABLE_MARGIN;

pub mod pipeline;

/// Horizon used when neither a flag nor the config file sets one.
pub const DEFAULT_HORIZON: u32 = 30;

/// Environment variable (or `.env` entry) naming a default config file.
const CONFIG_ENV: &str = "DEMAND_CONFIG";

/// Log file used while the dashboard owns the terminal.
const TUI_LOG_FILE: &str = "demand.log";

/// Entry point for the `demand` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may carry RUST_LOG / DEMAND_CONFIG; absence is fine.
    dotenvy::dotenv().ok();

    // We want `demand` and `demand -i data.csv` to behave like `demand tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Forecast(args) => {
            init_logging(LogTarget::Stderr);
            handle_forecast(args)
        }
        Command::Demo(args) => {
            init_logging(LogTarget::Stderr);
            handle_demo(args)
        }
        Command::Generate(args) => {
            init_logging(LogTarget::Stderr);
            handle_generate(args)
        }
        Command::Tui(args) => {
            init_logging(LogTarget::File(PathBuf::from(TUI_LOG_FILE)));
            handle_tui(args)
        }
    }
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Install the global subscriber. `RUST_LOG` overrides the `warn` default.
fn init_logging(target: LogTarget) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => match std::fs::File::create(&path) {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
            // The dashboard must not write to the terminal; run without logs.
            Err(_) => return,
        },
    };
    // A subscriber may already be set (tests, embedding); keep it.
    installed.ok();
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let input = match &args.input {
        Some(path) => crate::cli::picker::validate_csv_path(path)?,
        None => crate::cli::picker::prompt_for_csv_path()?,
    };
    let file = load_config_file(args.config.as_deref())?;
    let config = run_config_from_args(&args, input, &file)?;

    let (dataset, run) = pipeline::run_from_config(&config)?;

    println!("{}", crate::report::format_run_summary(&run));

    let tail = crate::report::tail_table(
        &run.result,
        &dataset,
        config.horizon as usize,
        config.table_margin,
    );
    println!("{}", crate::report::format_table(&tail));

    if config.plot {
        let history = history_points(&run.training, &config.target);
        let plot = crate::plot::render_forecast_plot(
            &history,
            &run.result,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        crate::io::write_forecast_csv(path, &run.result)?;
    }
    if let Some(path) = &config.export_chart {
        let series = [OverlaySeries {
            label: config.target.clone(),
            color: NAVY,
            history: history_points(&run.training, &config.target),
            result: &run.result,
        }];
        let title = format!("Forecast: {}", config.target);
        crate::plot::render_overlay(path, &title, &series)?;
    }
    if let Some(path) = &config.export_components {
        crate::plot::render_components(path, &run.result)?;
    }

    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let base = match &args.input {
        Some(path) => pipeline::load_demo_base(&crate::cli::picker::validate_csv_path(path)?)?,
        None => crate::data::flat_dataset(demo_start(), DEMO_DAYS, args.seed)?,
    };
    let mut config = pipeline::DemoConfig::new(base, args.seed)?;
    config.horizon = crate::domain::ForecastHorizon::new(args.horizon)?;

    let demo = pipeline::run_demo(&config)?;

    for run in &demo.runs {
        println!("{}", crate::report::format_run_summary(run));
        let tail = crate::report::tail_table(
            &run.result,
            &demo.enriched,
            args.horizon as usize,
            DEFAULT_TABLE_MARGIN,
        );
        println!("{}", crate::report::format_table(&tail));
    }

    if let Some(path) = &args.export {
        for run in &demo.runs {
            let target_path = suffixed_path(path, &run.result.target);
            crate::io::write_forecast_csv(&target_path, &run.result)?;
        }
    }
    if let Some(path) = &args.export_chart {
        let series: Vec<OverlaySeries<'_>> = demo
            .runs
            .iter()
            .zip(PALETTE)
            .map(|(run, color)| OverlaySeries {
                label: run.result.target.clone(),
                color,
                history: history_points(&run.training, &run.result.target),
                result: &run.result,
            })
            .collect();
        crate::plot::render_overlay(path, "Demo forecast: sales and customers", &series)?;
    }
    if let Some((path, run)) = args.export_components.as_ref().zip(demo.runs.first()) {
        crate::plot::render_components(path, &run.result)?;
    }

    Ok(())
}

/// Default span of a generated demo base.
const DEMO_DAYS: usize = 500;

fn demo_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let dataset = crate::data::flat_dataset(args.start, args.days, args.seed)?;
    crate::io::write_dataset_csv(&args.output, &dataset)?;
    info!(path = %args.output.display(), rows = dataset.len(), "generated demo base");
    println!("Wrote {} rows to {}", dataset.len(), args.output.display());
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let input = match &args.input {
        Some(path) => crate::cli::picker::validate_csv_path(path)?,
        None => crate::cli::picker::prompt_for_csv_path()?,
    };
    let file = load_config_file(args.config.as_deref())?;
    let model = model_config_from_args(&file.model, &args.model)?;
    crate::tui::run(crate::tui::Session {
        input,
        target: args.target.or(file.run.target),
        regressors: if args.regressors.is_empty() {
            file.run.regressors.unwrap_or_default()
        } else {
            args.regressors
        },
        horizon: args.horizon.or(file.run.horizon).unwrap_or(DEFAULT_HORIZON),
        model,
    })
}

/// `--config` wins over `DEMAND_CONFIG`; neither means built-in defaults.
fn load_config_file(path: Option<&Path>) -> Result<ConfigFile, AppError> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(from_env) {
        Some(path) => ConfigFile::from_file(&path),
        None => Ok(ConfigFile::default()),
    }
}

/// Apply command-line hyperparameters on top of the file's `[model]` table.
pub fn model_config_from_args(base: &ModelConfig, args: &ModelArgs) -> Result<ModelConfig, AppError> {
    let mut model = base.clone();
    if let Some(v) = args.changepoint_prior_scale {
        model.changepoint_prior_scale = v;
    }
    if let Some(v) = args.seasonality_prior_scale {
        model.seasonality_prior_scale = v;
    }
    if let Some(v) = args.n_changepoints {
        model.n_changepoints = v;
    }
    if let Some(v) = args.weekly_order {
        model.weekly_order = v;
    }
    model.yearly_seasonality |= args.yearly;
    model.daily_seasonality |= args.daily;
    if let Some(v) = args.interval_width {
        model.interval_width = v;
    }
    if let Some(v) = args.uncertainty_samples {
        model.uncertainty_samples = v;
    }
    if let Some(v) = args.seed {
        model.seed = v;
    }
    model.validate()?;
    Ok(model)
}

/// Merge flags, the config file, and defaults into a pipeline configuration.
pub fn run_config_from_args(
    args: &ForecastArgs,
    input: PathBuf,
    file: &ConfigFile,
) -> Result<RunConfig, AppError> {
    let target = args
        .target
        .clone()
        .or_else(|| file.run.target.clone())
        .ok_or_else(|| AppError::config("No target column. Pass one with `-t <column>`."))?;
    let regressors = if args.regressors.is_empty() {
        file.run.regressors.clone().unwrap_or_default()
    } else {
        args.regressors.clone()
    };

    Ok(RunConfig {
        input,
        target,
        regressors,
        start: args.start,
        end: args.end,
        horizon: args.horizon.or(file.run.horizon).unwrap_or(DEFAULT_HORIZON),
        model: model_config_from_args(&file.model, &args.model)?,
        table_margin: args
            .table_margin
            .or(file.run.table_margin)
            .unwrap_or(DEFAULT_TABLE_MARGIN),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_csv: args.export.clone(),
        export_chart: args.export_chart.clone(),
        export_components: args.export_components.clone(),
    })
}

/// Defined target values of a dataset, for plotting.
pub fn history_points(dataset: &Dataset, target: &str) -> Vec<(NaiveDate, f64)> {
    let Some(series) = dataset.series(target) else {
        return Vec::new();
    };
    dataset
        .dates()
        .into_iter()
        .zip(series)
        .filter_map(|(d, v)| v.map(|v| (d, v)))
        .collect()
}

/// `out.csv` + `y_vendite` -> `out_y_vendite.csv`.
fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

/// `(defined, total)` forecast rows after the cutoff.
pub fn defined_future(result: &ForecastResult) -> (usize, usize) {
    let future: Vec<_> = result.future_rows().collect();
    let defined = future.iter().filter(|r| r.yhat.is_some()).count();
    (defined, future.len())
}

/// Rewrite argv so `demand` defaults to `demand tui`.
///
/// Rules:
/// - `demand`                      -> `demand tui`
/// - `demand -i data.csv ...`      -> `demand tui -i data.csv ...`
/// - `demand --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "forecast" | "demo" | "generate" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn forecast_args(args: &[&str]) -> ForecastArgs {
        let mut full = vec!["demand", "forecast"];
        full.extend_from_slice(args);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Forecast(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_and_leading_flags_go_to_tui() {
        assert_eq!(rewrite_args(argv(&["demand"])), argv(&["demand", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["demand", "-i", "x.csv"])),
            argv(&["demand", "tui", "-i", "x.csv"])
        );
        assert_eq!(rewrite_args(argv(&["demand", "--help"])), argv(&["demand", "--help"]));
        assert_eq!(rewrite_args(argv(&["demand", "demo"])), argv(&["demand", "demo"]));
    }

    #[test]
    fn flags_override_config_file() {
        let file = ConfigFile::from_toml(
            "[model]\nchangepoint_prior_scale = 0.3\nweekly_order = 5\n\n[run]\ntarget = \"y_clienti\"\nregressors = [\"festivo\"]\nhorizon = 60\n",
        )
        .unwrap();
        let args = forecast_args(&["-t", "y_vendite", "--weekly-order", "2"]);
        let config = run_config_from_args(&args, PathBuf::from("x.csv"), &file).unwrap();

        assert_eq!(config.target, "y_vendite");
        assert_eq!(config.regressors, vec!["festivo".to_string()]);
        assert_eq!(config.horizon, 60);
        assert_eq!(config.model.changepoint_prior_scale, 0.3);
        assert_eq!(config.model.weekly_order, 2);
        assert_eq!(config.table_margin, DEFAULT_TABLE_MARGIN);
        assert!(config.plot);
    }

    #[test]
    fn defaults_without_config_file() {
        let args = forecast_args(&["-t", "y"]);
        let config = run_config_from_args(&args, PathBuf::from("x.csv"), &ConfigFile::default()).unwrap();
        assert_eq!(config.horizon, DEFAULT_HORIZON);
        assert!(config.regressors.is_empty());
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn missing_target_and_bad_hyperparameters_are_config_errors() {
        let args = forecast_args(&[]);
        let err = run_config_from_args(&args, PathBuf::from("x.csv"), &ConfigFile::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);

        let args = forecast_args(&["-t", "y", "--interval-width", "1.5"]);
        let err = run_config_from_args(&args, PathBuf::from("x.csv"), &ConfigFile::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn demo_exports_are_suffixed_per_target() {
        assert_eq!(
            suffixed_path(Path::new("out/forecast.csv"), "y_vendite"),
            PathBuf::from("out/forecast_y_vendite.csv")
        );
    }

    #[test]
    fn history_skips_missing_values() {
        let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
        let dataset = Dataset::new(
            vec!["y".into()],
            vec![
                crate::domain::TimeSeriesRecord { ds: d(1), values: vec![Some(1.0)] },
                crate::domain::TimeSeriesRecord { ds: d(2), values: vec![None] },
                crate::domain::TimeSeriesRecord { ds: d(3), values: vec![Some(3.0)] },
            ],
            Default::default(),
        )
        .unwrap();
        assert_eq!(history_points(&dataset, "y"), vec![(d(1), 1.0), (d(3), 3.0)]);
        assert!(history_points(&dataset, "nope").is_empty());
    }
}
