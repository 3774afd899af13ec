//! Chart image export (PNG / SVG) with Plotters.
//!
//! Two charts:
//! - overlay: history (dashed), forecast (solid), uncertainty band, shaded
//!   forecast period and a cutoff marker; several targets can share one chart
//! - components: one panel per additive component
//!
//! The x axis is "days since the first plotted date" so we do not need
//! Plotters' datetime coordinates; tick labels are formatted back into dates.
//!
//! Plotters is built without a font backend. SVG output carries its text as
//! `<text>` elements, but the bitmap backend cannot rasterize glyphs, so PNG
//! charts are drawn without captions, tick labels, or legends.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::ForecastResult;
use crate::error::AppError;

pub const NAVY: RGBColor = RGBColor(0, 0, 128);
pub const DARK_GREEN: RGBColor = RGBColor(0, 100, 0);
/// Series colors in assignment order.
pub const PALETTE: [RGBColor; 4] = [NAVY, DARK_GREEN, RGBColor(178, 34, 34), RGBColor(255, 140, 0)];

const OVERLAY_SIZE: (u32, u32) = (1400, 700);
const PANEL_SIZE: (u32, u32) = (1200, 260);

/// Output format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Ok(Self::Png),
            Some("svg") => Ok(Self::Svg),
            _ => Err(AppError::config(format!(
                "Unsupported chart format '{}': use a .png or .svg file name.",
                path.display()
            ))),
        }
    }

    fn draws_text(self) -> bool {
        matches!(self, Self::Svg)
    }
}

/// One target on the overlay chart.
#[derive(Debug, Clone)]
pub struct OverlaySeries<'a> {
    pub label: String,
    pub color: RGBColor,
    /// Training actuals.
    pub history: Vec<(NaiveDate, f64)>,
    pub result: &'a ForecastResult,
}

/// Write the overlay chart to `path` (`.png` or `.svg`).
pub fn render_overlay(path: &Path, title: &str, series: &[OverlaySeries<'_>]) -> Result<(), AppError> {
    let format = ImageFormat::from_path(path)?;
    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, OVERLAY_SIZE).into_drawing_area();
            draw_overlay(&root, title, series, format.draws_text()).map_err(|e| render_err(path, e))?;
            root.present().map_err(|e| render_err(path, e))?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, OVERLAY_SIZE).into_drawing_area();
            draw_overlay(&root, title, series, format.draws_text()).map_err(|e| render_err(path, e))?;
            root.present().map_err(|e| render_err(path, e))?;
        }
    }
    tracing::info!(path = %path.display(), series = series.len(), "wrote overlay chart");
    Ok(())
}

/// Write the components chart to `path` (`.png` or `.svg`).
pub fn render_components(path: &Path, result: &ForecastResult) -> Result<(), AppError> {
    if result.components.is_empty() {
        return Err(AppError::render("No components to plot."));
    }
    let format = ImageFormat::from_path(path)?;
    let size = (PANEL_SIZE.0, PANEL_SIZE.1 * result.components.len() as u32);
    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_components(&root, result, format.draws_text()).map_err(|e| render_err(path, e))?;
            root.present().map_err(|e| render_err(path, e))?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_components(&root, result, format.draws_text()).map_err(|e| render_err(path, e))?;
            root.present().map_err(|e| render_err(path, e))?;
        }
    }
    tracing::info!(path = %path.display(), panels = result.components.len(), "wrote components chart");
    Ok(())
}

fn render_err<E: std::error::Error + Send + Sync>(path: &Path, e: DrawingAreaErrorKind<E>) -> AppError {
    AppError::render(format!("Failed to draw chart '{}': {e}", path.display()))
}

/// Draw the overlay chart on any Plotters backend.
pub fn draw_overlay<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    series: &[OverlaySeries<'_>],
    text: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let dates = series
        .iter()
        .flat_map(|s| s.history.iter().map(|(d, _)| *d).chain(s.result.rows.iter().map(|r| r.ds)));
    let Some((origin, last)) = date_span(dates) else {
        return Ok(());
    };
    let x = |d: NaiveDate| (d - origin).num_days() as f64;
    let x_max = x(last).max(1.0);

    let values = series.iter().flat_map(|s| {
        s.history
            .iter()
            .map(|(_, v)| Some(*v))
            .chain(s.result.rows.iter().flat_map(|r| [r.yhat, r.yhat_lower, r.yhat_upper]))
    });
    let (y0, y1) = value_span(values.flatten());

    let mut builder = ChartBuilder::on(root);
    builder.margin(15);
    if text {
        builder
            .caption(title, ("sans-serif", 22))
            .x_label_area_size(40)
            .y_label_area_size(70);
    }
    let mut chart = builder.build_cartesian_2d(0.0..x_max, y0..y1)?;

    if text {
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Value")
            .x_labels(8)
            .y_labels(8)
            .x_label_formatter(&|v| fmt_day(origin, *v))
            .light_line_style(BLACK.mix(0.05))
            .draw()?;
    } else {
        draw_grid(&mut chart, x_max, y0, y1)?;
    }

    let cutoff = series.iter().map(|s| x(s.result.cutoff)).fold(0.0, f64::max);
    let period = chart.draw_series(std::iter::once(Rectangle::new(
        [(cutoff, y0), (x_max, y1)],
        BLACK.mix(0.06).filled(),
    )))?;
    if text {
        period
            .label("Forecast period")
            .legend(|(lx, ly)| Rectangle::new([(lx, ly - 5), (lx + 18, ly + 5)], BLACK.mix(0.12).filled()));
    }

    for s in series {
        let color = s.color;

        for band in band_segments(s.result, &x) {
            chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))?;
        }

        let history: Vec<(f64, f64)> = s.history.iter().map(|&(d, v)| (x(d), v)).collect();
        let dash = (history.len() / 150).max(1);
        let hist = chart.draw_series(
            dashes(&history, dash, dash)
                .into_iter()
                .map(|seg| PathElement::new(seg, color.mix(0.6).stroke_width(1))),
        )?;
        if text {
            hist.label(format!("{} history", s.label)).legend(move |(lx, ly)| {
                PathElement::new(vec![(lx, ly), (lx + 6, ly)], color.mix(0.6).stroke_width(1))
            });
        }

        let forecast = chart.draw_series(
            yhat_segments(s.result, &x)
                .into_iter()
                .map(|seg| PathElement::new(seg, color.stroke_width(2))),
        )?;
        if text {
            forecast
                .label(format!("{} forecast", s.label))
                .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 18, ly)], color.stroke_width(2)));
        }
    }

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(cutoff, y0), (cutoff, y1)],
        BLACK.mix(0.5).stroke_width(1),
    )))?;

    if text {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK.mix(0.4))
            .draw()?;
    }

    Ok(())
}

/// Draw one panel per component on any Plotters backend.
pub fn draw_components<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    result: &ForecastResult,
    text: bool,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let Some((origin, last)) = date_span(result.rows.iter().map(|r| r.ds)) else {
        return Ok(());
    };
    let x = |d: NaiveDate| (d - origin).num_days() as f64;
    let x_max = x(last).max(1.0);
    let cutoff = x(result.cutoff);

    let panels = root.split_evenly((result.components.len(), 1));
    for (panel, component) in panels.iter().zip(&result.components) {
        let (y0, y1) = value_span(component.values.iter().flatten().copied());

        let mut builder = ChartBuilder::on(panel);
        builder.margin(10);
        if text {
            builder
                .caption(&component.name, ("sans-serif", 16))
                .x_label_area_size(30)
                .y_label_area_size(70);
        }
        let mut chart = builder.build_cartesian_2d(0.0..x_max, y0..y1)?;

        if text {
            chart
                .configure_mesh()
                .x_labels(8)
                .y_labels(4)
                .x_label_formatter(&|v| fmt_day(origin, *v))
                .light_line_style(BLACK.mix(0.05))
                .draw()?;
        } else {
            draw_grid(&mut chart, x_max, y0, y1)?;
        }

        let points: Vec<(f64, Option<f64>)> = result
            .rows
            .iter()
            .zip(&component.values)
            .map(|(r, v)| (x(r.ds), *v))
            .collect();
        chart.draw_series(
            defined_runs(&points)
                .into_iter()
                .map(|seg| PathElement::new(seg, NAVY.stroke_width(2))),
        )?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(cutoff, y0), (cutoff, y1)],
            BLACK.mix(0.4).stroke_width(1),
        )))?;
    }

    Ok(())
}

fn draw_grid<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
    x_max: f64,
    y0: f64,
    y1: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let rows = (1..5).map(|i| {
        let y = y0 + (y1 - y0) * i as f64 / 5.0;
        PathElement::new(vec![(0.0, y), (x_max, y)], BLACK.mix(0.08))
    });
    chart.draw_series(rows)?;
    Ok(())
}

fn date_span(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    dates.fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}

/// Padded `[min, max]` of the finite values; `[-1, 1]` around a constant.
fn value_span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if hi <= lo {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn fmt_day(origin: NaiveDate, x: f64) -> String {
    (origin + Duration::days(x.round() as i64)).format("%Y-%m-%d").to_string()
}

/// Split `(x, Some(y))` runs into separate polylines at each `None`.
pub(crate) fn defined_runs(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in points {
        match y.filter(|v| v.is_finite()) {
            Some(y) => current.push((x, y)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn yhat_segments(result: &ForecastResult, x: &impl Fn(NaiveDate) -> f64) -> Vec<Vec<(f64, f64)>> {
    let points: Vec<(f64, Option<f64>)> = result.rows.iter().map(|r| (x(r.ds), r.yhat)).collect();
    defined_runs(&points)
}

/// Closed polygons (upper edge forward, lower edge back) per run of defined bounds.
fn band_segments(result: &ForecastResult, x: &impl Fn(NaiveDate) -> f64) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut upper: Vec<(f64, f64)> = Vec::new();
    let mut lower: Vec<(f64, f64)> = Vec::new();

    let mut flush = |upper: &mut Vec<(f64, f64)>, lower: &mut Vec<(f64, f64)>| {
        if upper.len() >= 2 {
            let mut poly = std::mem::take(upper);
            poly.extend(lower.drain(..).rev());
            out.push(poly);
        }
        upper.clear();
        lower.clear();
    };

    for r in &result.rows {
        match (r.yhat_lower, r.yhat_upper) {
            (Some(lo), Some(hi)) if lo.is_finite() && hi.is_finite() => {
                upper.push((x(r.ds), hi));
                lower.push((x(r.ds), lo));
            }
            _ => flush(&mut upper, &mut lower),
        }
    }
    flush(&mut upper, &mut lower);
    out
}

/// Dashed polyline: `on` segments drawn, then `off` skipped.
fn dashes(points: &[(f64, f64)], on: usize, off: usize) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < points.len() {
        let end = (i + on).min(points.len() - 1);
        out.push(points[i..=end].to_vec());
        i = end + off;
    }
    out
}
