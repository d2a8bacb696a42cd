//! Live terminal view of streaming samples.
//!
//! `mux watch` tails a data file as a capture script appends to it (or streams
//! the synthetic demo feed) and renders the traces over a rolling window. The
//! x-axis is the sample index, or elapsed seconds with `--by-time`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::cli::WatchArgs;
use crate::data::DemoFeed;
use crate::error::AppError;

mod chart;

use chart::LiveChart;

/// Poll/animation interval.
const TICK: Duration = Duration::from_millis(100);

/// Start the live view.
pub fn run(args: &WatchArgs) -> Result<(), AppError> {
    let source = Source::open(args)?;
    let window = Window::new(args);

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::numeric(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App {
        source,
        window,
        traces: args.traces.max(1),
        by_time: args.by_time,
        paused: false,
        started: Instant::now(),
        next_index: 0,
        title: args.title.clone().unwrap_or_else(|| "live samples".to_string()),
    };
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode()
            .map_err(|e| AppError::numeric(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::numeric(format!(
                "Failed to enter alternate screen: {e}"
            )));
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

/// Where samples come from.
enum Source {
    File { label: String, tail: FileTail },
    Demo(DemoFeed),
}

impl Source {
    fn open(args: &WatchArgs) -> Result<Self, AppError> {
        if args.demo {
            return Ok(Source::Demo(DemoFeed::new(args.traces.max(1), 42)?));
        }
        let path = args
            .data
            .as_ref()
            .ok_or_else(|| AppError::usage("Provide a data file to tail, or use --demo."))?;
        Ok(Source::File {
            label: path.display().to_string(),
            tail: FileTail::open(path)?,
        })
    }

    fn label(&self) -> &str {
        match self {
            Source::File { label, .. } => label,
            Source::Demo(_) => "demo feed",
        }
    }

    /// Collect the batches of per-trace values that arrived since last tick.
    fn poll(&mut self, traces: usize) -> Result<Vec<Vec<f64>>, AppError> {
        match self {
            Source::Demo(feed) => Ok(vec![feed.next_values()]),
            Source::File { tail, .. } => {
                let mut batches = Vec::new();
                for line in tail.read_new_lines()? {
                    if let Some(values) = parse_trace_line(&line, traces) {
                        batches.push(values);
                    }
                }
                Ok(batches)
            }
        }
    }
}

/// Incremental reader that survives partially written lines.
struct FileTail {
    reader: BufReader<File>,
    partial: String,
}

impl FileTail {
    fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::usage(format!("Failed to open '{}': {e}", path.display())))?;
        Ok(Self {
            reader: BufReader::new(file),
            partial: String::new(),
        })
    }

    /// Read whatever complete lines have been appended since the last call.
    ///
    /// A trailing fragment without a newline stays buffered until the writer
    /// finishes the line.
    fn read_new_lines(&mut self) -> Result<Vec<String>, AppError> {
        let mut out = Vec::new();
        loop {
            let mut chunk = String::new();
            let n = self
                .reader
                .read_line(&mut chunk)
                .map_err(|e| AppError::usage(format!("Read error while tailing: {e}")))?;
            if n == 0 {
                break;
            }
            self.partial.push_str(&chunk);
            if self.partial.ends_with('\n') {
                out.push(std::mem::take(&mut self.partial).trim().to_string());
            }
        }
        Ok(out)
    }
}

/// Parse the leading `traces` numeric fields of a line.
///
/// Comment lines, blank lines, and lines with too few numeric fields (e.g.
/// headers) are skipped.
fn parse_trace_line(line: &str, traces: usize) -> Option<Vec<f64>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut values = Vec::with_capacity(traces);
    for field in line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
    {
        match field.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            _ => return None,
        }
        if values.len() == traces {
            return Some(values);
        }
    }
    None
}

/// How the rolling window trims old samples.
enum WindowMode {
    Index { max_points: usize },
    Time { max_seconds: f64 },
}

/// Rolling window of `(x, per-trace values)` samples.
struct Window {
    points: VecDeque<(f64, Vec<f64>)>,
    mode: WindowMode,
}

impl Window {
    fn new(args: &WatchArgs) -> Self {
        let mode = if args.by_time {
            WindowMode::Time {
                max_seconds: args.max_seconds.max(1.0),
            }
        } else {
            WindowMode::Index {
                max_points: args.max_points.max(2),
            }
        };
        Self {
            points: VecDeque::new(),
            mode,
        }
    }

    fn push(&mut self, x: f64, values: Vec<f64>) {
        self.points.push_back((x, values));
        self.trim();
    }

    fn trim(&mut self) {
        match self.mode {
            WindowMode::Index { max_points } => {
                while self.points.len() > max_points {
                    self.points.pop_front();
                }
            }
            WindowMode::Time { max_seconds } => {
                let Some(&(newest, _)) = self.points.back() else {
                    return;
                };
                while let Some(&(oldest, _)) = self.points.front() {
                    if newest - oldest > max_seconds {
                        self.points.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn clear(&mut self) {
        self.points.clear();
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    /// Series for one trace, x rebased so the window starts at 0.
    fn series(&self, trace: usize) -> Vec<(f64, f64)> {
        let offset = self.points.front().map(|&(x, _)| x).unwrap_or(0.0);
        self.points
            .iter()
            .filter_map(|(x, values)| values.get(trace).map(|&y| (x - offset, y)))
            .collect()
    }
}

struct App {
    source: Source,
    window: Window,
    traces: usize,
    by_time: bool,
    paused: bool,
    started: Instant,
    next_index: u64,
    title: String,
}

impl App {
    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        loop {
            if !self.paused {
                self.ingest_tick()?;
            }

            terminal
                .draw(|f| self.draw(f))
                .map_err(|e| AppError::numeric(format!("Terminal draw error: {e}")))?;

            if !event::poll(TICK).map_err(|e| AppError::numeric(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::numeric(format!("Event read error: {e}")))? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char(' ') => self.paused = !self.paused,
                    KeyCode::Char('c') => self.window.clear(),
                    _ => {}
                },
                _ => {}
            }
        }
    }

    fn ingest_tick(&mut self) -> Result<(), AppError> {
        for values in self.source.poll(self.traces)? {
            let x = if self.by_time {
                self.started.elapsed().as_secs_f64()
            } else {
                let x = self.next_index as f64;
                self.next_index += 1;
                x
            };
            self.window.push(x, values);
        }
        Ok(())
    }

    fn draw(&self, f: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(f.area());

        let state = if self.paused { "paused" } else { "live" };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", self.title),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "| {} | {} sample(s) | {state}",
                self.source.label(),
                self.window.len()
            )),
        ]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, chunks[0]);

        if self.window.len() < 2 {
            let waiting = Paragraph::new("waiting for data...")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(waiting, chunks[1]);
        } else {
            let series: Vec<Vec<(f64, f64)>> =
                (0..self.traces).map(|t| self.window.series(t)).collect();
            let (x_bounds, y_bounds) = chart_bounds(&series);
            let x_label = if self.by_time { "Time [s]" } else { "Sample" };
            f.render_widget(
                LiveChart {
                    traces: &series,
                    x_bounds,
                    y_bounds,
                    x_label,
                    y_label: "value",
                },
                chunks[1],
            );
        }

        let footer = Paragraph::new(" q quit | space pause | c clear")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(footer, chunks[2]);
    }
}

/// Derive padded chart bounds from the visible series.
fn chart_bounds(series: &[Vec<(f64, f64)>]) -> ([f64; 2], [f64; 2]) {
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for trace in series {
        for &(x, y) in trace {
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if !(x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return ([0.0, 1.0], [0.0, 1.0]);
    }

    let y_span = (y_max - y_min).max(1e-9);
    (
        [0.0, x_max.max(1e-9)],
        [y_min - 0.1 * y_span, y_max + 0.1 * y_span],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch_args(by_time: bool) -> WatchArgs {
        WatchArgs {
            data: None,
            demo: true,
            traces: 2,
            max_points: 4,
            by_time,
            max_seconds: 10.0,
            title: None,
        }
    }

    #[test]
    fn index_window_keeps_only_the_newest_samples() {
        let mut window = Window::new(&watch_args(false));
        for i in 0..10 {
            window.push(i as f64, vec![i as f64, -(i as f64)]);
        }
        assert_eq!(window.len(), 4);
        let series = window.series(0);
        // Rebased: the oldest visible sample sits at x = 0.
        assert_eq!(series[0], (0.0, 6.0));
        assert_eq!(series[3], (3.0, 9.0));
    }

    #[test]
    fn time_window_drops_samples_outside_the_duration() {
        let mut window = Window::new(&watch_args(true));
        window.push(0.0, vec![1.0, 1.0]);
        window.push(8.0, vec![2.0, 2.0]);
        window.push(16.0, vec![3.0, 3.0]);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn trace_lines_parse_leading_numeric_fields() {
        assert_eq!(parse_trace_line("1.0, 2.5, 3", 2), Some(vec![1.0, 2.5]));
        assert_eq!(parse_trace_line("301 288", 2), Some(vec![301.0, 288.0]));
        assert_eq!(parse_trace_line("# comment", 1), None);
        assert_eq!(parse_trace_line("", 1), None);
        assert_eq!(parse_trace_line("time,volts", 2), None);
        assert_eq!(parse_trace_line("1.0", 2), None);
    }
}
