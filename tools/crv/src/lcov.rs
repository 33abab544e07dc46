use crate::coverage::{sum_counters, Class, Counter, CounterKind, Method, Package, Report};
use crate::errors::CrvError;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Record {
    source_path: String,
    lines: BTreeMap<u32, u64>,
    branches_covered: u64,
    branches_missed: u64,
    methods: BTreeMap<String, FunctionHits>,
}

#[derive(Debug, Default, Clone, Copy)]
struct FunctionHits {
    line: u32,
    hits: u64,
}

/// Parses an LCOV tracefile. Malformed lines are skipped; input without a
/// single `SF:` record is rejected.
pub fn parse_lcov(text: &str) -> Result<Report, CrvError> {
    let mut records = Vec::new();
    let mut current: Option<Record> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(path) = line.strip_prefix("SF:") {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(Record {
                source_path: path.trim().to_string(),
                ..Record::default()
            });
            continue;
        }
        if line == "end_of_record" {
            if let Some(done) = current.take() {
                records.push(done);
            }
            continue;
        }
        let Some(record) = current.as_mut() else {
            continue;
        };
        if let Some(rest) = line.strip_prefix("DA:") {
            if let Some((line_no, hits)) = parse_da(rest) {
                record.lines.insert(line_no, hits);
            }
        } else if let Some(rest) = line.strip_prefix("FNDA:") {
            if let Some((hits, name)) = parse_fnda(rest) {
                record.methods.entry(name).or_default().hits = hits;
            }
        } else if let Some(rest) = line.strip_prefix("FN:") {
            if let Some((line_no, name)) = parse_fn(rest) {
                record.methods.entry(name).or_default().line = line_no;
            }
        } else if let Some(rest) = line.strip_prefix("BRDA:") {
            match parse_brda(rest) {
                Some(true) => record.branches_covered += 1,
                Some(false) => record.branches_missed += 1,
                None => {}
            }
        }
    }
    if let Some(done) = current.take() {
        records.push(done);
    }
    records.retain(|record| !record.source_path.is_empty());
    if records.is_empty() {
        return Err(CrvError::ReportParse("lcov record not found".to_string()));
    }

    let mut report = Report {
        name: "lcov".to_string(),
        ..Report::default()
    };
    let mut package_index: HashMap<String, usize> = HashMap::new();
    for record in records {
        let (package_name, class_name) = split_source_path(&record.source_path);
        let ix = *package_index.entry(package_name.clone()).or_insert_with(|| {
            report.packages.push(Package {
                name: package_name,
                ..Package::default()
            });
            report.packages.len() - 1
        });
        report.packages[ix]
            .classes
            .push(record_to_class(class_name, record));
    }

    for package in &mut report.packages {
        package.classes.sort_by(|a, b| a.name.cmp(&b.name));
        package.counters = sum_counters(package.classes.iter().map(|c| c.counters.as_slice()));
    }
    report.packages.sort_by(|a, b| a.name.cmp(&b.name));
    report.counters = sum_counters(report.packages.iter().map(|p| p.counters.as_slice()));
    Ok(report)
}

fn parse_da(rest: &str) -> Option<(u32, u64)> {
    let mut parts = rest.split(',');
    let line_no = parts.next()?.trim().parse().ok()?;
    let hits = parts.next()?.trim().parse().ok()?;
    Some((line_no, hits))
}

fn parse_fn(rest: &str) -> Option<(u32, String)> {
    let (line_no, name) = rest.split_once(',')?;
    Some((line_no.trim().parse().ok()?, name.trim().to_string()))
}

fn parse_fnda(rest: &str) -> Option<(u64, String)> {
    let (hits, name) = rest.split_once(',')?;
    Some((hits.trim().parse().ok()?, name.trim().to_string()))
}

/// `Some(true)` for a taken branch, `Some(false)` for a missed one.
fn parse_brda(rest: &str) -> Option<bool> {
    let parts = rest.split(',').collect::<Vec<_>>();
    if parts.len() != 4 {
        return None;
    }
    let taken = parts[3].trim();
    if taken == "-" {
        return Some(false);
    }
    let value: u64 = taken.parse().ok()?;
    Some(value > 0)
}

fn split_source_path(source_path: &str) -> (String, String) {
    let cleaned = source_path.trim().replace('\\', "/");
    if cleaned.is_empty() {
        return ("default".to_string(), "unknown".to_string());
    }
    match cleaned.rsplit_once('/') {
        Some((dir, base)) if !base.is_empty() => {
            let dir = if dir.is_empty() { "default" } else { dir };
            (dir.to_string(), base.to_string())
        }
        Some(_) => ("default".to_string(), cleaned),
        None => ("default".to_string(), cleaned),
    }
}

fn record_to_class(name: String, record: Record) -> Class {
    let covered_lines = record.lines.values().filter(|hits| **hits > 0).count() as u64;
    let missed_lines = record.lines.len() as u64 - covered_lines;

    let mut counters = vec![
        Counter::new(CounterKind::Instruction, missed_lines, covered_lines),
        Counter::new(CounterKind::Line, missed_lines, covered_lines),
    ];
    if record.branches_covered + record.branches_missed > 0 {
        counters.push(Counter::new(
            CounterKind::Branch,
            record.branches_missed,
            record.branches_covered,
        ));
    }
    counters.sort_by_key(|counter| counter.kind);

    let methods = record
        .methods
        .into_iter()
        .map(|(method_name, hits)| {
            let (missed, covered) = if hits.hits > 0 { (0, 1) } else { (1, 0) };
            Method {
                name: method_name,
                desc: String::new(),
                line: hits.line,
                counters: vec![Counter::new(CounterKind::Instruction, missed, covered)],
            }
        })
        .collect();

    Class {
        name,
        source_file: record.source_path,
        methods,
        counters,
    }
}
