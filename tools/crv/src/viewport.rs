use crate::compact::display_width;
use crate::coverage::{Counter, CounterKind};
use crate::nav::NavFrame;
use crate::rows::Row;

pub const DEFAULT_WIDTH: u16 = 100;
pub const DEFAULT_HEIGHT: u16 = 30;

/// Breadcrumb, three blank separators, children header and help line.
const BASE_OVERHEAD_LINES: usize = 6;
/// Cells taken by marker, percentage and bar around the name column.
const RESERVED_FOR_BAR_AND_PERCENT: usize = 16;
const MIN_NAME_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Counter kinds the summary panel lists for a node, in display order.
pub fn summary_kinds(counters: &[Counter]) -> Vec<CounterKind> {
    CounterKind::ALL
        .into_iter()
        .filter(|kind| counters.iter().any(|counter| counter.kind == *kind))
        .collect()
}

/// Header plus one line per present kind; an empty summary still shows a
/// placeholder line.
pub fn summary_line_count(counters: &[Counter]) -> usize {
    1 + summary_kinds(counters).len().max(1)
}

pub fn visible_row_capacity(height: u16, summary_lines: usize, status_lines: usize) -> usize {
    (height as usize)
        .saturating_sub(summary_lines + BASE_OVERHEAD_LINES + status_lines)
        .max(1)
}

/// Clamps the cursor to the row set and scrolls just enough to keep it
/// inside a window of `capacity` rows.
pub fn clamp_frame(frame: &mut NavFrame, row_count: usize, capacity: usize) {
    if row_count == 0 {
        frame.cursor = 0;
        frame.offset = 0;
        return;
    }
    let capacity = capacity.max(1);
    frame.cursor = frame.cursor.min(row_count - 1);
    if frame.cursor < frame.offset {
        frame.offset = frame.cursor;
    }
    if frame.cursor >= frame.offset + capacity {
        frame.offset = frame.cursor + 1 - capacity;
    }
    frame.offset = frame.offset.min(row_count.saturating_sub(capacity));
}

/// Moves the cursor by `delta`, stopping at either end.
pub fn move_cursor(frame: &mut NavFrame, delta: isize, row_count: usize, capacity: usize) {
    if row_count == 0 {
        frame.cursor = 0;
        frame.offset = 0;
        return;
    }
    let max = row_count - 1;
    frame.cursor = if delta.is_negative() {
        frame.cursor.saturating_sub(delta.unsigned_abs())
    } else {
        frame.cursor.saturating_add(delta.unsigned_abs()).min(max)
    };
    clamp_frame(frame, row_count, capacity);
}

/// Half-open index range of the rows currently on screen.
pub fn window(frame: &NavFrame, row_count: usize, capacity: usize) -> std::ops::Range<usize> {
    let shown = capacity.max(1).min(row_count);
    let start = frame.offset.min(row_count - shown);
    start..start + shown
}

pub fn name_column_width(rows: &[Row], terminal_width: u16) -> usize {
    let longest = rows
        .iter()
        .map(|row| display_width(&row.name))
        .max()
        .unwrap_or(0);
    let cap = (terminal_width as usize)
        .saturating_sub(RESERVED_FOR_BAR_AND_PERCENT)
        .max(MIN_NAME_WIDTH);
    longest.min(cap)
}

pub fn summary_bar_width(terminal_width: u16) -> usize {
    (terminal_width as usize).saturating_sub(24).clamp(6, 30)
}

pub fn children_bar_width(terminal_width: u16, name_width: usize) -> usize {
    (terminal_width as usize)
        .saturating_sub(name_width + 12)
        .clamp(4, 20)
}
