//! Plotters-powered forecast chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! The x axis is "days since the first plotted date", like the exported charts.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call (see
/// `ChartData::from_run`), so `render()` only draws.
pub struct ForecastChart<'a> {
    /// Observed target values in the training window.
    pub history: &'a [(f64, f64)],
    /// Forecast polylines, split where the forecast is undefined.
    pub yhat: &'a [Vec<(f64, f64)>],
    pub lower: &'a [Vec<(f64, f64)>],
    pub upper: &'a [Vec<(f64, f64)>],
    /// X position of the last training date.
    pub cutoff: f64,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl Widget for ForecastChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            // Tick labels are drawn by the caller around the chart rect.
            let mut chart = ChartBuilder::on(&root).margin(1).build_cartesian_2d(x0..x1, y0..y1)?;

            let line_color = RGBColor(0, 255, 255); // cyan
            let band_color = RGBColor(0, 128, 128);
            let cutoff_color = RGBColor(255, 255, 0);

            chart.draw_series(LineSeries::new([(self.cutoff, y0), (self.cutoff, y1)], &cutoff_color))?;

            for segment in self.lower.iter().chain(self.upper) {
                chart.draw_series(LineSeries::new(segment.iter().copied(), &band_color))?;
            }
            for segment in self.yhat {
                chart.draw_series(LineSeries::new(segment.iter().copied(), &line_color))?;
            }

            // `Pixel` rather than `Circle`: the ratatui backend maps circle radii
            // to canvas units and draws huge markers.
            chart.draw_series(self.history.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
