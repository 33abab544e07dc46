use crate::errors::CrvError;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), CrvError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CrvError::Io(e.to_string()))?;
            }
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| CrvError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CrvError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| CrvError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| CrvError::Io(e.to_string()))?;
        Ok(())
    }
}

/// Session event sink. A missing logger or a failed write never reaches the
/// dashboard.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    logger: Option<JsonlLogger>,
}

impl EventLog {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            logger: path.map(JsonlLogger::new),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn record(&self, level: &str, event_type: &str, payload: Value) {
        if let Some(logger) = &self.logger {
            let _ = logger.append(&LogEvent {
                level,
                event_type,
                payload,
            });
        }
    }

    pub fn session_started(&self, paths: &[PathBuf], watch_mode: &str) {
        self.record(
            "info",
            "session_started",
            json!({ "paths": paths, "watch_mode": watch_mode }),
        );
    }

    pub fn reload_succeeded(&self, report_name: &str, packages: usize) {
        self.record(
            "info",
            "reload_succeeded",
            json!({ "report": report_name, "packages": packages }),
        );
    }

    pub fn reload_failed(&self, error: &str) {
        self.record("warn", "reload_failed", json!({ "error": error }));
    }

    pub fn probe_changed(&self) {
        self.record("info", "probe_changed", json!({}));
    }

    pub fn probe_failed(&self, error: &str) {
        self.record("warn", "probe_failed", json!({ "error": error }));
    }

    pub fn session_finished(&self) {
        self.record("info", "session_finished", json!({}));
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{truncate_json, EventLog, JsonlLogger, LogEvent};
    use serde_json::{json, Value};

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("session.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;

        logger
            .append(&LogEvent {
                level: "info",
                event_type: "reload_failed",
                payload: json!({"error": "abcdefghijklmnopqrstuvwxyz"}),
            })
            .expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"event_type\":\"reload_failed\""));
        assert!(text.contains("..."));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let value = json!({"name": "日本語日本語日本語"});
        let Value::String(cut) = truncate_json(value, 12) else {
            panic!("expected truncated string");
        };
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 12);
    }

    #[test]
    fn event_log_writes_one_object_per_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.jsonl");
        let log = EventLog::new(Some(path.as_path()));
        log.session_started(&[dir.path().join("lcov.info")], "passive");
        log.probe_changed();
        log.reload_succeeded("lcov", 3);
        log.session_finished();

        let text = std::fs::read_to_string(&path).expect("read");
        let events = text
            .lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).expect("json line");
                value["event_type"].as_str().unwrap_or_default().to_string()
            })
            .collect::<Vec<_>>();
        assert_eq!(
            events,
            vec![
                "session_started",
                "probe_changed",
                "reload_succeeded",
                "session_finished"
            ]
        );
    }

    #[test]
    fn disabled_log_and_unwritable_paths_are_silent() {
        EventLog::disabled().reload_failed("ignored");
        let dir = tempfile::tempdir().expect("tempdir");
        let log = EventLog::new(Some(dir.path()));
        log.probe_failed("cannot append to a directory");
    }
}
