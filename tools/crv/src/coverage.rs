use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterKind {
    Instruction,
    Branch,
    Line,
    Complexity,
    Method,
    Class,
}

impl CounterKind {
    /// Canonical display order.
    pub const ALL: [Self; 6] = [
        Self::Instruction,
        Self::Branch,
        Self::Line,
        Self::Complexity,
        Self::Method,
        Self::Class,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instruction => "instruction",
            Self::Branch => "branch",
            Self::Line => "line",
            Self::Complexity => "complexity",
            Self::Method => "method",
            Self::Class => "class",
        }
    }

    /// Accepts the report spelling (`INSTRUCTION`) as well as the lowercase name.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub kind: CounterKind,
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    pub fn new(kind: CounterKind, missed: u64, covered: u64) -> Self {
        Self {
            kind,
            missed,
            covered,
        }
    }

    pub fn total(&self) -> u64 {
        self.missed.saturating_add(self.covered)
    }

    pub fn coverage_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.covered as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub counters: Vec<Counter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub counters: Vec<Counter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub counters: Vec<Counter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub counters: Vec<Counter>,
}

pub fn find_counter(counters: &[Counter], kind: CounterKind) -> Option<Counter> {
    counters.iter().copied().find(|counter| counter.kind == kind)
}

/// Coverage percentage for `kind`, 0 when the counter is absent.
pub fn coverage_for(counters: &[Counter], kind: CounterKind) -> f64 {
    find_counter(counters, kind)
        .map(|counter| counter.coverage_rate())
        .unwrap_or(0.0)
}

impl Method {
    pub fn counter(&self, kind: CounterKind) -> Option<Counter> {
        find_counter(&self.counters, kind)
    }

    /// Name followed by the signature (if any) and `:line` (if known).
    pub fn display_name(&self) -> String {
        let mut label = self.name.clone();
        label.push_str(&self.desc);
        if self.line > 0 {
            label.push_str(&format!(":{}", self.line));
        }
        label
    }

    fn merge_key(&self) -> (String, String, u32) {
        (self.name.clone(), self.desc.clone(), self.line)
    }
}

impl Class {
    pub fn counter(&self, kind: CounterKind) -> Option<Counter> {
        find_counter(&self.counters, kind)
    }
}

impl Package {
    pub fn counter(&self, kind: CounterKind) -> Option<Counter> {
        find_counter(&self.counters, kind)
    }
}

impl Report {
    pub fn counter(&self, kind: CounterKind) -> Option<Counter> {
        find_counter(&self.counters, kind)
    }
}

/// Sums counters of equal kind into one list ordered by `CounterKind::ALL`.
pub fn sum_counters<'a>(groups: impl IntoIterator<Item = &'a [Counter]>) -> Vec<Counter> {
    let mut merged = Vec::new();
    for group in groups {
        merge_counters_into(&mut merged, group);
    }
    merged
}

fn merge_counters_into(dst: &mut Vec<Counter>, src: &[Counter]) {
    for counter in src {
        match dst.iter_mut().find(|existing| existing.kind == counter.kind) {
            Some(existing) => {
                existing.missed = existing.missed.saturating_add(counter.missed);
                existing.covered = existing.covered.saturating_add(counter.covered);
            }
            None => dst.push(*counter),
        }
    }
    dst.sort_by_key(|counter| counter.kind);
}

/// Merges reports by package name, class name and method identity. The merged
/// report keeps the first report's name.
pub fn merge_reports(reports: Vec<Report>) -> Report {
    let mut iter = reports.into_iter();
    let Some(first) = iter.next() else {
        return Report::default();
    };

    let mut merged = Report {
        name: first.name.clone(),
        ..Report::default()
    };
    let mut package_index: HashMap<String, usize> = HashMap::new();

    for report in std::iter::once(first).chain(iter) {
        merge_counters_into(&mut merged.counters, &report.counters);
        for package in report.packages {
            let ix = *package_index
                .entry(package.name.clone())
                .or_insert_with(|| {
                    merged.packages.push(Package {
                        name: package.name.clone(),
                        ..Package::default()
                    });
                    merged.packages.len() - 1
                });
            merge_package(&mut merged.packages[ix], package);
        }
    }

    merged.packages.sort_by(|a, b| a.name.cmp(&b.name));
    merged
}

fn merge_package(dst: &mut Package, src: Package) {
    merge_counters_into(&mut dst.counters, &src.counters);
    for class in src.classes {
        match dst.classes.iter_mut().find(|existing| existing.name == class.name) {
            Some(existing) => merge_class(existing, class),
            None => {
                let mut fresh = Class {
                    name: class.name.clone(),
                    source_file: class.source_file.clone(),
                    ..Class::default()
                };
                merge_class(&mut fresh, class);
                dst.classes.push(fresh);
            }
        }
    }
    dst.classes.sort_by(|a, b| a.name.cmp(&b.name));
}

fn merge_class(dst: &mut Class, src: Class) {
    if dst.source_file.is_empty() {
        dst.source_file = src.source_file;
    }
    merge_counters_into(&mut dst.counters, &src.counters);
    for method in src.methods {
        let key = method.merge_key();
        match dst
            .methods
            .iter_mut()
            .find(|existing| existing.merge_key() == key)
        {
            Some(existing) => merge_counters_into(&mut existing.counters, &method.counters),
            None => dst.methods.push(method),
        }
    }
    dst.methods.sort_by_key(Method::merge_key);
}
