use crv::app::{AppState, Event, ViewConfig};
use crv::coverage::{Counter, CounterKind};
use crv::hotkeys::Key;
use crv::report_loader::{detect_format, FileReportLoader, ReportFormat, ReportLoader};
use crv::runtime::{FileSystem, ProductionFileSystem};
use crv::tui::view_text;
use crv::watch::WatchWiring;
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR")))
}

fn loader(paths: Vec<PathBuf>) -> FileReportLoader {
    let fs: Arc<dyn FileSystem> = Arc::new(ProductionFileSystem);
    FileReportLoader::new(paths, fs)
}

#[test]
fn jacoco_fixture_is_detected_by_its_root_element() {
    let contents = std::fs::read_to_string(fixture("reports/jacoco.xml")).expect("fixture");
    assert_eq!(detect_format(&contents), Ok(ReportFormat::Jacoco));
}

#[test]
fn jacoco_rollups_fill_from_the_level_below() {
    let report = loader(vec![fixture("reports/jacoco.xml")])
        .load()
        .expect("load");
    assert_eq!(report.name, "ledger");

    let package = &report.packages[0];
    let audit = &package.classes[1];
    assert_eq!(audit.name, "com/example/ledger/Audit");
    assert_eq!(
        audit.counters,
        vec![
            Counter::new(CounterKind::Instruction, 5, 0),
            Counter::new(CounterKind::Line, 2, 0),
            Counter::new(CounterKind::Method, 1, 0),
        ]
    );

    let expected = vec![
        Counter::new(CounterKind::Instruction, 9, 9),
        Counter::new(CounterKind::Branch, 1, 1),
        Counter::new(CounterKind::Line, 3, 3),
        Counter::new(CounterKind::Complexity, 1, 2),
        Counter::new(CounterKind::Method, 1, 2),
        Counter::new(CounterKind::Class, 0, 1),
    ];
    assert_eq!(package.counters, expected);
    assert_eq!(report.counters, expected);
}

#[test]
fn jacoco_methods_render_with_signatures() {
    let report = loader(vec![fixture("reports/jacoco.xml")])
        .load()
        .expect("load");
    let mut state = AppState::new(report, ViewConfig::default(), WatchWiring::default());
    state.update(Event::Resize {
        width: 100,
        height: 30,
    });
    let root = view_text(&state);
    assert!(root.starts_with("Report(ledger)"));
    assert!(root.contains("complexity"));

    state.update(Event::Key(Key::Enter));
    state.update(Event::Key(Key::Enter));
    let methods = view_text(&state);
    assert!(methods.contains("<init>()V:3"), "{methods}");
    assert!(methods.contains("deposit(J)V:8"), "{methods}");
}

#[test]
fn jacoco_and_lcov_sources_merge() {
    let report = loader(vec![
        fixture("reports/jacoco.xml"),
        fixture("reports/sample.info"),
    ])
    .load()
    .expect("load");
    assert_eq!(report.name, "ledger");
    let names = report
        .packages
        .iter()
        .map(|package| package.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["com/example/ledger", "src/app", "src/util"]);
}

#[test]
fn forced_format_overrides_detection() {
    let result = loader(vec![fixture("reports/jacoco.xml")])
        .with_format(ReportFormat::Json)
        .load();
    assert!(result.is_err());

    let report = loader(vec![fixture("reports/jacoco.xml")])
        .with_format(ReportFormat::Jacoco)
        .load()
        .expect("load");
    assert_eq!(report.packages[0].classes.len(), 2);
}
