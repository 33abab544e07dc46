use crv::config::{load_config, CliOverrides};
use crv::rows::SortMode;
use crv::runtime::ProductionFileSystem;
use crv::watch::WatchMode;
use std::path::PathBuf;
use std::time::Duration;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(format!("{}/tests/fixtures/{path}", env!("CARGO_MANIFEST_DIR")))
}

#[test]
fn file_values_feed_the_view_and_watch_settings() {
    let overrides = CliOverrides {
        config_path: Some(fixture("configs/auto-watch.toml")),
        ..CliOverrides::default()
    };
    let cfg = load_config(&overrides, &ProductionFileSystem).expect("config");
    let view = cfg.view_config();
    assert_eq!(view.threshold, 70.0);
    assert_eq!(view.sort, SortMode::CoverageAsc);
    assert_eq!(view.watch, WatchMode::Auto);
    assert_eq!(cfg.interval(), Duration::from_millis(500));
}

#[test]
fn flags_win_over_the_file() {
    let overrides = CliOverrides {
        config_path: Some(fixture("configs/auto-watch.toml")),
        threshold: Some(55.0),
        sort: Some("name".to_string()),
        no_watch: true,
        ..CliOverrides::default()
    };
    let cfg = load_config(&overrides, &ProductionFileSystem).expect("config");
    let view = cfg.view_config();
    assert_eq!(view.threshold, 55.0);
    assert_eq!(view.sort, SortMode::NameAsc);
    assert_eq!(view.watch, WatchMode::Off);
    assert_eq!(cfg.interval(), Duration::from_millis(500));
}
