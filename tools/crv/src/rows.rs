use crate::coverage::{coverage_for, Counter, CounterKind, Report};
use crate::nav::{NavFrame, NodeLevel};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    NameAsc,
    CoverageAsc,
    CoverageDesc,
}

impl SortMode {
    pub fn next(self) -> Self {
        match self {
            Self::NameAsc => Self::CoverageAsc,
            Self::CoverageAsc => Self::CoverageDesc,
            Self::CoverageDesc => Self::NameAsc,
        }
    }

    /// Maps the configured initial sort key; anything but `coverage` sorts by name.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "coverage" => Self::CoverageAsc,
            _ => Self::NameAsc,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "name asc",
            Self::CoverageAsc => "coverage asc",
            Self::CoverageDesc => "coverage desc",
        }
    }
}

/// Counter used for child-row percentages and coverage sorting.
pub fn next_counter(kind: CounterKind) -> CounterKind {
    match kind {
        CounterKind::Instruction => CounterKind::Branch,
        CounterKind::Branch => CounterKind::Line,
        _ => CounterKind::Instruction,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub active: bool,
    pub query: String,
}

impl FilterState {
    pub fn label(&self) -> &str {
        if self.query.trim().is_empty() {
            "off"
        } else {
            &self.query
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub original_index: usize,
    pub name: String,
    pub coverage: f64,
}

/// Unfiltered, unsorted children of the node `frame` points at. Frames with
/// stale indices project to no rows.
pub fn child_rows(report: &Report, frame: &NavFrame, counter: CounterKind) -> Vec<Row> {
    match frame.level {
        NodeLevel::Report => report
            .packages
            .iter()
            .enumerate()
            .map(|(ix, package)| Row {
                original_index: ix,
                name: package.name.clone(),
                coverage: coverage_for(&package.counters, counter),
            })
            .collect(),
        NodeLevel::Package => report
            .packages
            .get(frame.package_ix)
            .map(|package| {
                package
                    .classes
                    .iter()
                    .enumerate()
                    .map(|(ix, class)| Row {
                        original_index: ix,
                        name: class.name.clone(),
                        coverage: coverage_for(&class.counters, counter),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        NodeLevel::Class => report
            .packages
            .get(frame.package_ix)
            .and_then(|package| package.classes.get(frame.class_ix))
            .map(|class| {
                class
                    .methods
                    .iter()
                    .enumerate()
                    .map(|(ix, method)| Row {
                        original_index: ix,
                        name: method.display_name(),
                        coverage: coverage_for(&method.counters, counter),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Counters of the node `frame` points at; empty for stale frames.
pub fn node_counters<'a>(report: &'a Report, frame: &NavFrame) -> &'a [Counter] {
    match frame.level {
        NodeLevel::Report => &report.counters,
        NodeLevel::Package => report
            .packages
            .get(frame.package_ix)
            .map(|package| package.counters.as_slice())
            .unwrap_or_default(),
        NodeLevel::Class => report
            .packages
            .get(frame.package_ix)
            .and_then(|package| package.classes.get(frame.class_ix))
            .map(|class| class.counters.as_slice())
            .unwrap_or_default(),
    }
}

/// Keeps rows whose name contains `query`, case-insensitively.
pub fn filter_rows(rows: Vec<Row>, query: &str) -> Vec<Row> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| row.name.to_lowercase().contains(&query))
        .collect()
}

/// Stable sort; coverage modes break ties by ascending name.
pub fn sort_rows(rows: &mut [Row], mode: SortMode) {
    match mode {
        SortMode::NameAsc => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        SortMode::CoverageAsc => rows.sort_by(|a, b| {
            cmp_coverage(a.coverage, b.coverage).then_with(|| a.name.cmp(&b.name))
        }),
        SortMode::CoverageDesc => rows.sort_by(|a, b| {
            cmp_coverage(b.coverage, a.coverage).then_with(|| a.name.cmp(&b.name))
        }),
    }
}

fn cmp_coverage(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// The rows a frame shows: projected from the live model, filtered, sorted.
pub fn visible_rows(
    report: &Report,
    frame: &NavFrame,
    counter: CounterKind,
    filter: &FilterState,
    sort: SortMode,
) -> Vec<Row> {
    let mut rows = filter_rows(child_rows(report, frame, counter), &filter.query);
    sort_rows(&mut rows, sort);
    rows
}
