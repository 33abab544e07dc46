use crate::app::AppState;
use crate::compact::{compact_name, pad_right};
use crate::coverage::CounterKind;
use crate::errors::CrvError;
use crate::hotkeys::{controls_legend, FILTER_PROMPT_HINT, RELOAD_PROMPT_HINT};
use crate::nav::NodeLevel;
use crate::rows::node_counters;
use crate::viewport::{children_bar_width, name_column_width, summary_bar_width, summary_kinds};
use crate::watch::{format_interval, WatchMode};
use ratatui::backend::TestBackend;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

const CURSOR_MARKER: &str = "❯";
const HIGH_WATERMARK: f64 = 90.0;

const PURPLE: Color = Color::Rgb(0xBD, 0x93, 0xF9);
const CYAN: Color = Color::Rgb(0x8B, 0xE9, 0xFD);
const PINK: Color = Color::Rgb(0xFF, 0x79, 0xC6);
const COMMENT: Color = Color::Rgb(0x62, 0x72, 0xA4);
const GREEN: Color = Color::Rgb(0x50, 0xFA, 0x7B);
const YELLOW: Color = Color::Rgb(0xF1, 0xFA, 0x8C);
const RED: Color = Color::Rgb(0xFF, 0x55, 0x55);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Mid,
    High,
}

pub fn band_for_coverage(rate: f64, threshold: f64) -> Band {
    if rate >= HIGH_WATERMARK {
        Band::High
    } else if rate >= threshold {
        Band::Mid
    } else {
        Band::Low
    }
}

/// Styles for one frame. With `no_color` every slot is `Style::default()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub title: Style,
    pub header: Style,
    pub cursor: Style,
    pub help: Style,
    high: Style,
    mid: Style,
    low: Style,
    threshold: f64,
}

impl Theme {
    pub fn new(no_color: bool, threshold: f64) -> Self {
        if no_color {
            return Self {
                title: Style::default(),
                header: Style::default(),
                cursor: Style::default(),
                help: Style::default(),
                high: Style::default(),
                mid: Style::default(),
                low: Style::default(),
                threshold,
            };
        }
        Self {
            title: Style::default().fg(PURPLE).add_modifier(Modifier::BOLD),
            header: Style::default().fg(CYAN).add_modifier(Modifier::BOLD),
            cursor: Style::default().fg(PINK).add_modifier(Modifier::BOLD),
            help: Style::default().fg(COMMENT),
            high: Style::default().fg(GREEN),
            mid: Style::default().fg(YELLOW),
            low: Style::default().fg(RED),
            threshold,
        }
    }

    pub fn for_coverage(&self, rate: f64) -> Style {
        match band_for_coverage(rate, self.threshold) {
            Band::High => self.high,
            Band::Mid => self.mid,
            Band::Low => self.low,
        }
    }
}

/// Proportional fill bar; the filled part rounds down.
pub fn bar(rate: f64, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let filled = ((rate / 100.0) * width as f64).floor();
    let filled = if filled.is_nan() {
        0
    } else {
        (filled.max(0.0) as usize).min(width)
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Root label plus one label per pushed level; adjacent repeats collapse.
pub fn breadcrumb_labels(state: &AppState) -> Vec<String> {
    let report = state.report();
    let root = if report.name.is_empty() {
        "Report".to_string()
    } else {
        format!("Report({})", report.name)
    };
    let mut labels = vec![root];
    for frame in state.stack().frames().skip(1) {
        let Some(package) = report.packages.get(frame.package_ix) else {
            continue;
        };
        match frame.level {
            NodeLevel::Report => {}
            NodeLevel::Package => labels.push(package.name.clone()),
            NodeLevel::Class => {
                if let Some(class) = package.classes.get(frame.class_ix) {
                    labels.push(package.name.clone());
                    labels.push(class.name.clone());
                }
            }
        }
    }
    labels.dedup();
    labels
}

fn status_lines(state: &AppState) -> Vec<String> {
    let mut lines = Vec::new();
    let watch = state.watch();
    if state.watch_active() {
        let word = match (watch.last_error.is_some(), watch.mode) {
            (true, _) => "error",
            (false, WatchMode::Passive) => "passive",
            (false, _) => "on",
        };
        lines.push(format!(
            "watch: {word} ({} polling)",
            format_interval(state.wiring().interval)
        ));
    }
    if let Some(error) = &watch.last_error {
        lines.push(format!("watch error: {error}"));
    }
    if watch.pending_confirmation {
        lines.push(format!("report changed on disk, reload now? {RELOAD_PROMPT_HINT}"));
    }
    if state.filter().active {
        lines.push(format!("filter> {} {FILTER_PROMPT_HINT}", state.filter().query));
    }
    lines
}

fn summary_lines(state: &AppState, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("Summary (counter: {})", state.counter().as_str()),
        theme.header,
    ))];
    let counters = node_counters(state.report(), state.stack().current());
    let bar_width = summary_bar_width(state.geometry().width);
    for kind in summary_kinds(counters) {
        let rate = counters
            .iter()
            .find(|counter| counter.kind == kind)
            .map(|counter| counter.coverage_rate())
            .unwrap_or(0.0);
        lines.push(Line::from(Span::styled(
            summary_row(kind, rate, bar_width),
            theme.for_coverage(rate),
        )));
    }
    if lines.len() == 1 {
        lines.push(Line::from("(no counters)"));
    }
    lines
}

fn summary_row(kind: CounterKind, rate: f64, bar_width: usize) -> String {
    format!("{:<12} {:6.1}%  {}", kind.as_str(), rate, bar(rate, bar_width))
}

fn children_lines(state: &AppState, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "Children ({}, {}, filter={})",
            state.sort().label(),
            state.counter().as_str(),
            state.filter().label()
        ),
        theme.header,
    ))];
    let rows = state.rows();
    if rows.is_empty() {
        lines.push(Line::from("(no children)"));
        return lines;
    }
    let width = state.geometry().width;
    let name_width = name_column_width(&rows, width);
    let bar_width = children_bar_width(width, name_width);
    let cursor = state.stack().current().cursor;
    let range = state.visible_window(rows.len());
    for (ix, row) in rows.iter().enumerate().take(range.end).skip(range.start) {
        let selected = ix == cursor;
        let marker = if selected { CURSOR_MARKER } else { " " };
        let text = format!(
            "{marker} {} {:6.1}% {}",
            pad_right(&compact_name(&row.name, name_width), name_width),
            row.coverage,
            bar(row.coverage, bar_width)
        );
        let style = if selected {
            theme.cursor
        } else {
            theme.for_coverage(row.coverage)
        };
        lines.push(Line::from(Span::styled(text, style)));
    }
    lines
}

/// The whole frame, top to bottom.
pub fn view_lines(state: &AppState) -> Vec<Line<'static>> {
    let theme = Theme::new(state.config().no_color, state.config().threshold);
    let mut lines = vec![
        Line::from(Span::styled(breadcrumb_labels(state).join(" > "), theme.title)),
        Line::default(),
    ];
    lines.extend(summary_lines(state, &theme));
    lines.push(Line::default());
    lines.extend(children_lines(state, &theme));
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!(
            "sort: {}  counter: {}  filter: {} | {}",
            state.sort().label(),
            state.counter().as_str(),
            state.filter().label(),
            controls_legend()
        ),
        theme.help,
    )));
    lines.extend(
        status_lines(state)
            .into_iter()
            .map(|line| Line::from(Span::styled(line, theme.help))),
    );
    lines
}

/// Plain-text projection of `view_lines`, one line per row.
pub fn view_text(state: &AppState) -> String {
    view_lines(state)
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn draw(frame: &mut Frame<'_>, state: &AppState) {
    frame.render_widget(Paragraph::new(Text::from(view_lines(state))), frame.area());
}

/// Renders one frame at the state's geometry into a string of cells.
pub fn render_snapshot(state: &AppState) -> Result<String, CrvError> {
    let geometry = state.geometry();
    let backend = TestBackend::new(geometry.width, geometry.height);
    let mut terminal = Terminal::new(backend).map_err(|e| CrvError::Terminal(e.to_string()))?;
    terminal
        .draw(|frame| draw(frame, state))
        .map_err(|e| CrvError::Terminal(e.to_string()))?;

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..geometry.height {
        for x in 0..geometry.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}
