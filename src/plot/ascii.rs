//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - history actuals: `o`
//! - forecast (fitted + extrapolated): `-` line
//! - uncertainty bounds: `:`
//! - cutoff (last training date): `|`

use chrono::NaiveDate;

use crate::domain::ForecastResult;

/// Render history and forecast on one character grid.
pub fn render_forecast_plot(
    history: &[(NaiveDate, f64)],
    result: &ForecastResult,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some(origin) = history
        .iter()
        .map(|(d, _)| *d)
        .chain(result.rows.iter().map(|r| r.ds))
        .min()
    else {
        return "Plot: no data\n".to_string();
    };
    let last = history
        .iter()
        .map(|(d, _)| *d)
        .chain(result.rows.iter().map(|r| r.ds))
        .max()
        .unwrap_or(origin);

    let x_of = |d: NaiveDate| (d - origin).num_days() as f64;
    let x_max = x_of(last).max(1.0);

    let (y_min, y_max) = y_range(history, result).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Forecast line first; gaps (undefined yhat) break the line.
    let mut prev: Option<(usize, usize)> = None;
    for row in &result.rows {
        let Some(y) = row.yhat.filter(|v| v.is_finite()) else {
            prev = None;
            continue;
        };
        let x = map_x(x_of(row.ds), x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, yy, '-'),
            None => put(&mut grid, x, yy, '-'),
        }
        prev = Some((x, yy));
    }

    for row in &result.rows {
        let x = map_x(x_of(row.ds), x_max, width);
        for bound in [row.yhat_lower, row.yhat_upper].into_iter().flatten() {
            if bound.is_finite() {
                put(&mut grid, x, map_y(bound, y_min, y_max, height), ':');
            }
        }
    }

    let cutoff_x = map_x(x_of(result.cutoff), x_max, width);
    for y in 0..height {
        put(&mut grid, cutoff_x, y, '|');
    }

    // Actuals overlay everything.
    for &(d, v) in history {
        if v.is_finite() {
            let x = map_x(x_of(d), x_max, width);
            grid[map_y(v, y_min, y_max, height)][x] = 'o';
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: ds=[{origin}, {last}] | y=[{y_min:.2}, {y_max:.2}] | cutoff={}\n",
        result.cutoff
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn y_range(history: &[(NaiveDate, f64)], result: &ForecastResult) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let values = history.iter().map(|(_, v)| Some(*v)).chain(
        result
            .rows
            .iter()
            .flat_map(|r| [r.yhat, r.yhat_lower, r.yhat_upper]),
    );
    for v in values.flatten().filter(|v| v.is_finite()) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn put(grid: &mut [Vec<char>], x: usize, y: usize, ch: char) {
    if let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
        if *cell == ' ' {
            *cell = ch;
        }
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 {
            put(grid, x0 as usize, y0 as usize, ch);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
