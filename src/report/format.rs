//! Formatted terminal output: run summary and the tail table.

use crate::app::pipeline::ForecastRun;
use crate::report::TailRow;

/// Format the run summary (training window, fit diagnostics, horizon, warnings).
pub fn format_run_summary(run: &ForecastRun) -> String {
    let mut out = String::new();
    let result = &run.result;

    out.push_str("=== demand - additive forecast ===\n");
    out.push_str(&format!("Target: {}\n", result.target));
    match (run.training.first_date(), run.training.last_date()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "Training window: {first} .. {last} ({} rows, {} fitted)\n",
            run.training.len(),
            run.observations
        )),
        _ => out.push_str("Training window: empty\n"),
    }
    let regressors = if run.regressors.is_empty() {
        "(none)".to_string()
    } else {
        run.regressors.join(", ")
    };
    out.push_str(&format!("Regressors: {regressors}\n"));

    let future: Vec<_> = result.future_rows().collect();
    let defined = future.iter().filter(|r| r.yhat.is_some()).count();
    out.push_str(&format!(
        "Horizon: {} day(s) after {} ({} defined)\n",
        future.len(),
        result.cutoff,
        defined
    ));
    out.push_str(&format!("In-sample RMSE: {}\n", fmt_value(Some(run.rmse))));

    let components: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();
    out.push_str(&format!("Components: {}\n", components.join(", ")));

    if !run.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &run.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }
    out.push('\n');

    out
}

/// Render tail-table rows for the terminal.
pub fn format_table(rows: &[TailRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<10} {:>12} {:>12} {:>12} {:>12}\n",
            "ds", "actual", "yhat", "yhat_lower", "yhat_upper"
        )
        .trim_end(),
    );
    out.push('\n');

    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<12} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<10} {:>12} {:>12} {:>12} {:>12}\n",
                r.ds.to_string(),
                fmt_value(r.actual),
                fmt_value(r.yhat),
                fmt_value(r.yhat_lower),
                fmt_value(r.yhat_upper),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_value(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.2}"),
        _ => "-".to_string(),
    }
}
