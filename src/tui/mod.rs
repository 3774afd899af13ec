//! Ratatui-based forecasting dashboard.
//!
//! The dashboard holds the session (one loaded dataset plus the current
//! parameters) and re-runs the shared pipeline on each trigger. Errors land in
//! the status line; the session survives them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};
use tracing::info;

use crate::app::pipeline::{ForecastRequest, ForecastRun, run_forecast};
use crate::data::DatasetRegressors;
use crate::domain::{Dataset, ForecastHorizon, ModelConfig, TrainingWindow};
use crate::error::AppError;
use crate::io::ingest::{load_dataset, required_columns};
use crate::plot::{NAVY, OverlaySeries};

mod forecast_chart;

use forecast_chart::ForecastChart;

/// Initial dashboard parameters, resolved from flags and the config file.
#[derive(Debug, Clone)]
pub struct Session {
    pub input: PathBuf,
    pub target: Option<String>,
    pub regressors: Vec<String>,
    pub horizon: u32,
    pub model: ModelConfig,
}

const MAX_HORIZON: u32 = 365;
const TABLE_MARGIN: usize = crate::report::DEFAULT_TABLE_MARGIN;

/// Start the dashboard.
pub fn run(session: Session) -> Result<(), AppError> {
    // Load before taking over the terminal so schema errors print normally.
    let required = required_columns(session.target.as_slice(), &session.regressors);
    let dataset = load_dataset(&session.input, &required)?;
    let mut app = App::new(session, dataset)?;
    app.trigger();

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::io(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::io(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::io(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Target,
    Start,
    End,
    Regressors,
    Horizon,
}

const FIELDS: [Field; 5] = [Field::Target, Field::Start, Field::End, Field::Regressors, Field::Horizon];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Status {
    kind: StatusKind,
    text: String,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Info, text: text.into() }
    }

    fn warning(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Warning, text: text.into() }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Error, text: text.into() }
    }

    fn color(&self) -> Color {
        match self.kind {
            StatusKind::Info => Color::Green,
            StatusKind::Warning => Color::Yellow,
            StatusKind::Error => Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ExportKind {
    Csv,
    Chart,
    Components,
}

struct App {
    input: PathBuf,
    dataset: Dataset,
    /// Numeric columns: candidates for both target and regressors.
    columns: Vec<String>,
    target: usize,
    /// Regressor toggles, parallel to `columns`.
    selected: Vec<bool>,
    regressor_cursor: usize,
    start_input: String,
    end_input: String,
    horizon: u32,
    model: ModelConfig,
    field: usize,
    editing: Option<Field>,
    edit_buffer: String,
    table_scroll: u16,
    status: Status,
    run: Option<ForecastRun>,
}

impl App {
    fn new(session: Session, dataset: Dataset) -> Result<Self, AppError> {
        let columns: Vec<String> = dataset
            .value_columns()
            .filter(|c| dataset.is_numeric(c))
            .map(String::from)
            .collect();
        if columns.is_empty() {
            return Err(AppError::schema("No numeric columns to forecast."));
        }

        let target = match &session.target {
            Some(name) => columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| AppError::fit(format!("Target column `{name}` is not numeric.")))?,
            None => 0,
        };
        if let Some(bad) = session.regressors.iter().find(|r| !columns.contains(*r)) {
            return Err(AppError::fit(format!("Regressor `{bad}` is not numeric.")));
        }
        let selected = columns.iter().map(|c| session.regressors.contains(c)).collect();

        let date_text = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

        Ok(Self {
            input: session.input,
            start_input: date_text(dataset.first_date()),
            end_input: date_text(dataset.last_date()),
            dataset,
            columns,
            target,
            selected,
            regressor_cursor: 0,
            horizon: session.horizon.clamp(1, MAX_HORIZON),
            model: session.model,
            field: 0,
            editing: None,
            edit_buffer: String::new(),
            table_scroll: 0,
            status: Status::info("Ready."),
            run: None,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::io(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::io(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::io(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn current_field(&self) -> Field {
        FIELDS[self.field]
    }

    fn target_name(&self) -> &str {
        &self.columns[self.target]
    }

    /// Selected regressors, never including the current target.
    fn regressor_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.selected)
            .enumerate()
            .filter(|&(i, (_, &on))| on && i != self.target)
            .map(|(_, (name, _))| name.clone())
            .collect()
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if let Some(field) = self.editing {
            self.handle_date_edit(field, code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.field = self.field.saturating_sub(1),
            KeyCode::Down => self.field = (self.field + 1).min(FIELDS.len() - 1),
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::PageDown if self.current_field() == Field::Horizon => self.adjust(-10),
            KeyCode::PageUp if self.current_field() == Field::Horizon => self.adjust(10),
            KeyCode::Char(' ') if self.current_field() == Field::Regressors => {
                let i = self.regressor_cursor;
                if i == self.target {
                    self.status = Status::warning("The target cannot be its own regressor.");
                } else {
                    self.selected[i] = !self.selected[i];
                }
            }
            KeyCode::Enter => match self.current_field() {
                field @ (Field::Start | Field::End) => {
                    self.editing = Some(field);
                    self.edit_buffer = match field {
                        Field::Start => self.start_input.clone(),
                        _ => self.end_input.clone(),
                    };
                    self.status = Status::info("Editing date (YYYY-MM-DD, empty = dataset bound). Enter to apply, Esc to cancel.");
                }
                _ => self.trigger(),
            },
            KeyCode::Char('r') => self.trigger(),
            KeyCode::Char('e') => self.export(ExportKind::Csv),
            KeyCode::Char('c') => self.export(ExportKind::Chart),
            KeyCode::Char('p') => self.export(ExportKind::Components),
            KeyCode::Char(']') => self.table_scroll = self.table_scroll.saturating_add(1),
            KeyCode::Char('[') => self.table_scroll = self.table_scroll.saturating_sub(1),
            _ => {}
        }

        false
    }

    fn handle_date_edit(&mut self, field: Field, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = Status::info("Date edit canceled.");
            }
            KeyCode::Enter => {
                self.editing = None;
                let text = self.edit_buffer.trim().to_string();
                match parse_date_input(&text) {
                    Ok(_) => {
                        match field {
                            Field::Start => self.start_input = text,
                            _ => self.end_input = text,
                        }
                        self.status = Status::info("Date updated. Press r to run.");
                    }
                    Err(err) => self.status = Status::error(err.to_string()),
                }
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => self.edit_buffer.push(c),
            _ => {}
        }
    }

    fn adjust(&mut self, delta: i32) {
        match self.current_field() {
            Field::Target => {
                let n = self.columns.len() as i32;
                self.target = (self.target as i32 + delta.signum()).rem_euclid(n) as usize;
                self.status = Status::info(format!("target: {}", self.target_name()));
            }
            Field::Regressors => {
                let n = self.columns.len() as i32;
                self.regressor_cursor = (self.regressor_cursor as i32 + delta.signum()).rem_euclid(n) as usize;
            }
            Field::Horizon => {
                let next = (self.horizon as i64 + delta as i64).clamp(1, MAX_HORIZON as i64);
                self.horizon = next as u32;
            }
            field @ (Field::Start | Field::End) => {
                let input = match field {
                    Field::Start => &mut self.start_input,
                    _ => &mut self.end_input,
                };
                if let Ok(Some(date)) = parse_date_input(input) {
                    *input = (date + chrono::Duration::days(delta as i64)).to_string();
                }
            }
        }
    }

    /// Re-run the pipeline from the current parameters.
    fn trigger(&mut self) {
        match self.forecast() {
            Ok(run) => {
                self.status = match run.warnings.as_slice() {
                    [] => {
                        let (defined, total) = crate::app::defined_future(&run.result);
                        Status::info(format!(
                            "Fitted {}: {defined}/{total} forecast day(s) defined, rmse {:.2}.",
                            run.result.target, run.rmse
                        ))
                    }
                    [only] => Status::warning(only.clone()),
                    [first, rest @ ..] => Status::warning(format!("{first} (+{} more)", rest.len())),
                };
                self.table_scroll = 0;
                self.run = Some(run);
            }
            Err(err) => {
                self.run = None;
                self.status = Status::error(err.to_string());
            }
        }
    }

    fn forecast(&self) -> Result<ForecastRun, AppError> {
        let start = parse_date_input(&self.start_input)?;
        let end = parse_date_input(&self.end_input)?;
        let request = ForecastRequest {
            dataset: &self.dataset,
            target: self.target_name().to_string(),
            regressors: self.regressor_names(),
            window: TrainingWindow::resolve(&self.dataset, start, end)?,
            horizon: ForecastHorizon::new(self.horizon)?,
            model: self.model.clone(),
        };
        info!(column = %request.target, horizon = self.horizon, "dashboard run");
        run_forecast(&request, &DatasetRegressors::new(&self.dataset))
    }

    fn export(&mut self, kind: ExportKind) {
        let Some(run) = &self.run else {
            self.status = Status::error("Nothing to export: run a forecast first (r).");
            return;
        };
        let target = &run.result.target;
        let (path, outcome) = match kind {
            ExportKind::Csv => {
                let path = PathBuf::from(format!("forecast_{target}.csv"));
                let outcome = crate::io::write_forecast_csv(&path, &run.result);
                (path, outcome)
            }
            ExportKind::Chart => {
                let path = PathBuf::from(format!("forecast_{target}.svg"));
                let series = [OverlaySeries {
                    label: target.clone(),
                    color: NAVY,
                    history: crate::app::history_points(&run.training, target),
                    result: &run.result,
                }];
                let outcome = crate::plot::render_overlay(&path, &format!("Forecast: {target}"), &series);
                (path, outcome)
            }
            ExportKind::Components => {
                let path = PathBuf::from(format!("components_{target}.svg"));
                let outcome = crate::plot::render_components(&path, &run.result);
                (path, outcome)
            }
        };
        self.status = match outcome {
            Ok(()) => Status::info(format!("Wrote {}", path.display())),
            Err(err) => Status::error(err.to_string()),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("demand", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " - {} | {} rows | {} .. {}",
                self.input.display(),
                self.dataset.len(),
                self.dataset.first_date().map(|d| d.to_string()).unwrap_or_default(),
                self.dataset.last_date().map(|d| d.to_string()).unwrap_or_default(),
            )),
        ]));

        let summary = match &self.run {
            Some(run) => format!(
                "target: {} | regressors: {} | fitted rows: {} | rmse={:.3} | cutoff: {}",
                run.result.target,
                if run.regressors.is_empty() { "-".to_string() } else { run.regressors.join(", ") },
                run.observations,
                run.rmse,
                run.result.cutoff,
            ),
            None => "no forecast".to_string(),
        };
        lines.push(Line::from(Span::styled(summary, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(34), Constraint::Min(0)])
            .split(area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(12)])
            .split(columns[1]);

        self.draw_settings(frame, columns[0]);
        self.draw_chart(frame, right[0]);
        self.draw_table(frame, right[1]);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let focused = self.current_field();
        let heading = |field: Field, text: String| {
            let style = if field == focused {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Line::from(Span::styled(text, style))
        };
        let cursor_style = |on: bool| {
            if on {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            }
        };

        let mut lines = vec![heading(Field::Target, "Target".to_string())];
        for (i, name) in self.columns.iter().enumerate() {
            let mark = if i == self.target { "(•)" } else { "( )" };
            lines.push(Line::from(Span::raw(format!("  {mark} {name}"))));
        }

        for field in [Field::Start, Field::End] {
            let (label, value) = match field {
                Field::Start => ("Start", &self.start_input),
                _ => ("End  ", &self.end_input),
            };
            let shown = if self.editing == Some(field) {
                format!("{}_", self.edit_buffer)
            } else {
                value.clone()
            };
            lines.push(heading(field, format!("{label}: {shown}")));
        }

        lines.push(heading(Field::Regressors, "Regressors (space toggles)".to_string()));
        for (i, name) in self.columns.iter().enumerate() {
            let text = if i == self.target {
                format!("  [-] {name} (target)")
            } else {
                let mark = if self.selected[i] { "[x]" } else { "[ ]" };
                format!("  {mark} {name}")
            };
            let on = focused == Field::Regressors && i == self.regressor_cursor;
            lines.push(Line::from(Span::styled(text, cursor_style(on))));
        }

        lines.push(heading(Field::Horizon, format!("Horizon: {} day(s)", self.horizon)));
        lines.push(Line::from(Span::styled(
            format!("  {}", slider(self.horizon, MAX_HORIZON, 24)),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Parameters").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Forecast").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some(data) = self.run.as_ref().map(ChartData::from_run) else {
            let msg = Paragraph::new("No forecast yet: adjust parameters and press r.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = ForecastChart {
            history: &data.history,
            yhat: &data.yhat,
            lower: &data.lower,
            upper: &data.upper,
            cutoff: data.cutoff,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &data, self.target_name());
        }
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let text = match &self.run {
            Some(run) => {
                let rows = crate::report::tail_table(&run.result, &self.dataset, self.horizon as usize, TABLE_MARGIN);
                crate::report::format_table(&rows)
            }
            None => String::new(),
        };
        let p = Paragraph::new(text)
            .scroll((self.table_scroll, 0))
            .block(Block::default().title("Tail ([ / ] scroll)").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ field  ←/→ adjust  Enter edit/run  r run  e csv  c chart  p components  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status.text, Style::default().fg(self.status.color())),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Empty input means "use the dataset bound".
fn parse_date_input(text: &str) -> Result<Option<NaiveDate>, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::range(format!("Invalid date '{text}': expected YYYY-MM-DD.")))
}

fn slider(value: u32, max: u32, width: usize) -> String {
    let filled = ((value as f64 / max as f64) * width as f64).round() as usize;
    let filled = filled.clamp(1, width);
    format!("[{}{}]", "=".repeat(filled), "-".repeat(width - filled))
}

/// Chart series in "days since origin" coordinates.
struct ChartData {
    origin: NaiveDate,
    history: Vec<(f64, f64)>,
    yhat: Vec<Vec<(f64, f64)>>,
    lower: Vec<Vec<(f64, f64)>>,
    upper: Vec<Vec<(f64, f64)>>,
    cutoff: f64,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl ChartData {
    fn from_run(run: &ForecastRun) -> Self {
        let result = &run.result;
        let origin = result.rows.first().map(|r| r.ds).unwrap_or(result.cutoff);
        let x = |d: NaiveDate| (d - origin).num_days() as f64;

        let history: Vec<(f64, f64)> = crate::app::history_points(&run.training, &result.target)
            .into_iter()
            .map(|(d, v)| (x(d), v))
            .collect();
        let series = |pick: fn(&crate::domain::ForecastPoint) -> Option<f64>| {
            let points: Vec<(f64, Option<f64>)> = result.rows.iter().map(|r| (x(r.ds), pick(r))).collect();
            crate::plot::chart::defined_runs(&points)
        };
        let yhat = series(|r| r.yhat);
        let lower = series(|r| r.yhat_lower);
        let upper = series(|r| r.yhat_upper);

        let x_max = result.rows.last().map(|r| x(r.ds)).unwrap_or(0.0).max(1.0);

        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let all = history
            .iter()
            .chain(yhat.iter().flatten())
            .chain(lower.iter().flatten())
            .chain(upper.iter().flatten());
        for &(_, y) in all {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
            let mid = if y_min.is_finite() { y_min } else { 0.0 };
            y_min = mid - 1.0;
            y_max = mid + 1.0;
        }
        let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

        Self {
            origin,
            history,
            yhat,
            lower,
            upper,
            cutoff: x(result.cutoff),
            x_bounds: [0.0, x_max],
            y_bounds: [y_min - pad, y_max + pad],
        }
    }

    fn date_label(&self, x: f64) -> String {
        (self.origin + chrono::Duration::days(x.round() as i64)).to_string()
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 6,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    data: &ChartData,
    y_name: &str,
) {
    let ticks = 4usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = data.x_bounds;
    let [y0, y1] = data.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = data.date_label(x0 + u * (x1 - x0));
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height || start + label_len > inner.x + inner.width {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y0 + u * (y1 - y0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.0}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("ds (| = cutoff)")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new(y_name.to_string())
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.min(insets.left + 20),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(regressors: &[&str]) -> App {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dataset = crate::data::flat_dataset(start, 90, 7).unwrap();
        let session = Session {
            input: PathBuf::from("demo.csv"),
            target: Some("y_vendite".into()),
            regressors: regressors.iter().map(|s| s.to_string()).collect(),
            horizon: 14,
            model: ModelConfig {
                uncertainty_samples: 50,
                ..ModelConfig::default()
            },
        };
        App::new(session, dataset).unwrap()
    }

    fn focus(app: &mut App, field: Field) {
        app.field = FIELDS.iter().position(|f| *f == field).unwrap();
    }

    #[test]
    fn run_fills_window_plus_horizon() {
        let mut app = app(&["meteo_temp", "festivo"]);
        app.trigger();
        let run = app.run.as_ref().expect("forecast");
        assert_eq!(run.result.rows.len(), 90 + 14);
        assert_eq!(run.regressors, vec!["meteo_temp".to_string(), "festivo".to_string()]);
        assert_ne!(app.status.kind, StatusKind::Error);
    }

    #[test]
    fn inverted_window_keeps_session_and_reports_error() {
        let mut app = app(&[]);
        app.start_input = "2024-03-01".into();
        app.end_input = "2024-02-01".into();
        app.trigger();
        assert!(app.run.is_none());
        assert_eq!(app.status.kind, StatusKind::Error);

        app.end_input = "2024-03-20".into();
        app.trigger();
        let run = app.run.as_ref().expect("forecast after fixing the window");
        assert_eq!(run.training.first_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn date_edit_applies_valid_input_only() {
        let mut app = app(&[]);
        focus(&mut app, Field::Start);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.editing, Some(Field::Start));
        app.edit_buffer.clear();
        for c in "2024-02-10".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.start_input, "2024-02-10");

        app.handle_key(KeyCode::Enter);
        app.edit_buffer = "2024-13-40".into();
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.start_input, "2024-02-10");
        assert_eq!(app.status.kind, StatusKind::Error);
    }

    #[test]
    fn target_is_never_its_own_regressor() {
        let mut app = app(&["meteo_temp"]);
        focus(&mut app, Field::Regressors);
        app.regressor_cursor = app.target;
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.regressor_names(), vec!["meteo_temp".to_string()]);

        focus(&mut app, Field::Target);
        let meteo = app.columns.iter().position(|c| c == "meteo_temp").unwrap();
        while app.target != meteo {
            app.handle_key(KeyCode::Right);
        }
        assert!(app.regressor_names().is_empty());
    }

    #[test]
    fn horizon_stays_in_slider_range() {
        let mut app = app(&[]);
        focus(&mut app, Field::Horizon);
        for _ in 0..5 {
            app.handle_key(KeyCode::PageDown);
        }
        assert_eq!(app.horizon, 1);
        app.horizon = 360;
        app.handle_key(KeyCode::PageUp);
        assert_eq!(app.horizon, MAX_HORIZON);
    }

    #[test]
    fn export_without_run_is_reported() {
        let mut app = app(&[]);
        app.handle_key(KeyCode::Char('e'));
        assert_eq!(app.status.kind, StatusKind::Error);
    }

    #[test]
    fn chart_data_bounds_cover_series() {
        let mut app = app(&[]);
        app.trigger();
        let data = ChartData::from_run(app.run.as_ref().unwrap());
        assert_eq!(data.x_bounds, [0.0, (90 + 14 - 1) as f64]);
        assert_eq!(data.cutoff, 89.0);
        for &(_, y) in data.history.iter().chain(data.yhat.iter().flatten()) {
            assert!(data.y_bounds[0] <= y && y <= data.y_bounds[1]);
        }
        assert_eq!(data.date_label(0.0), "2024-01-01");
    }

    #[test]
    fn unknown_session_target_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dataset = crate::data::flat_dataset(start, 10, 1).unwrap();
        let session = Session {
            input: PathBuf::from("x.csv"),
            target: Some("nope".into()),
            regressors: Vec::new(),
            horizon: 10,
            model: ModelConfig::default(),
        };
        assert!(App::new(session, dataset).is_err());
    }

    #[test]
    fn slider_is_proportional() {
        assert_eq!(slider(365, 365, 10), "[==========]");
        assert_eq!(slider(1, 365, 10), "[=---------]");
    }
}
