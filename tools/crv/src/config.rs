use crate::app::{ViewConfig, DEFAULT_THRESHOLD};
use crate::errors::CrvError;
use crate::report_loader::ReportFormat;
use crate::rows::SortMode;
use crate::runtime::FileSystem;
use crate::watch::WatchMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub sort: Option<String>,
    pub format: Option<ReportFormat>,
    pub watch: bool,
    pub no_watch: bool,
    pub no_color: bool,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub view: ViewSection,
    pub report: ReportSection,
    pub watch: WatchSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewSection {
    pub threshold: f64,
    pub sort: String,
    pub no_color: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSection {
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchSection {
    pub mode: WatchMode,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSection {
    pub path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            view: ViewSection {
                threshold: DEFAULT_THRESHOLD,
                sort: "name".to_string(),
                no_color: false,
            },
            report: ReportSection {
                format: ReportFormat::Auto,
            },
            watch: WatchSection {
                mode: WatchMode::Passive,
                interval_ms: 1000,
            },
            logging: LoggingSection { path: None },
        }
    }
}

impl AppConfig {
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            threshold: self.view.threshold,
            sort: SortMode::from_key(&self.view.sort),
            no_color: self.view.no_color,
            watch: self.watch.mode,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.watch.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    view: Option<PartialViewSection>,
    report: Option<PartialReportSection>,
    watch: Option<PartialWatchSection>,
    logging: Option<PartialLoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialViewSection {
    threshold: Option<f64>,
    sort: Option<String>,
    no_color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialReportSection {
    format: Option<ReportFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialWatchSection {
    mode: Option<WatchMode>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialLoggingSection {
    path: Option<PathBuf>,
}

/// Defaults, then the TOML file named by `--config`, then flags.
pub fn load_config(overrides: &CliOverrides, fs: &dyn FileSystem) -> Result<AppConfig, CrvError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| CrvError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(view) = partial.view {
        if let Some(value) = view.threshold {
            cfg.view.threshold = value;
        }
        if let Some(value) = view.sort {
            cfg.view.sort = value;
        }
        if let Some(value) = view.no_color {
            cfg.view.no_color = value;
        }
    }

    if let Some(format) = partial.report.and_then(|report| report.format) {
        cfg.report.format = format;
    }

    if let Some(watch) = partial.watch {
        if let Some(value) = watch.mode {
            cfg.watch.mode = value;
        }
        if let Some(value) = watch.interval_ms {
            cfg.watch.interval_ms = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(threshold) = overrides.threshold {
        cfg.view.threshold = threshold;
    }
    if let Some(sort) = &overrides.sort {
        cfg.view.sort = sort.clone();
    }
    if let Some(format) = overrides.format {
        cfg.report.format = format;
    }
    if overrides.no_color {
        cfg.view.no_color = true;
    }
    if overrides.watch {
        cfg.watch.mode = WatchMode::Auto;
    }
    if overrides.no_watch {
        cfg.watch.mode = WatchMode::Off;
    }
    if let Some(path) = &overrides.log_file {
        cfg.logging.path = Some(path.clone());
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), CrvError> {
    if !(0.0..=100.0).contains(&cfg.view.threshold) {
        return Err(CrvError::InvalidConfig(format!(
            "view.threshold must be between 0 and 100, got {}",
            cfg.view.threshold
        )));
    }

    if !matches!(cfg.view.sort.as_str(), "name" | "coverage") {
        return Err(CrvError::InvalidConfig(format!(
            "view.sort must be \"name\" or \"coverage\", got {:?}",
            cfg.view.sort
        )));
    }

    if cfg.watch.interval_ms == 0 {
        return Err(CrvError::InvalidConfig(
            "watch.interval_ms must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
