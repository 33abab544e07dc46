use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    Off,
    Auto,
    #[default]
    Passive,
}

impl WatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" => Some(Self::Off),
            "auto" => Some(Self::Auto),
            "passive" => Some(Self::Passive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Passive => "passive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Auto mode: reload unconditionally.
    Watch,
    /// Passive mode: ask the change probe first.
    Probe,
}

/// Which external collaborators the driver actually has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchWiring {
    pub has_reload: bool,
    pub has_probe: bool,
    pub interval: Duration,
}

impl Default for WatchWiring {
    fn default() -> Self {
        Self {
            has_reload: false,
            has_probe: false,
            interval: DEFAULT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchState {
    pub mode: WatchMode,
    pub pending_confirmation: bool,
    pub last_error: Option<String>,
}

impl WatchState {
    pub fn new(mode: WatchMode) -> Self {
        Self {
            mode,
            pending_confirmation: false,
            last_error: None,
        }
    }

    /// The recurring tick this mode drives, if its collaborator is wired.
    pub fn tick_kind(&self, wiring: &WatchWiring) -> Option<TickKind> {
        match self.mode {
            WatchMode::Auto if wiring.has_reload => Some(TickKind::Watch),
            WatchMode::Passive if wiring.has_probe && wiring.has_reload => Some(TickKind::Probe),
            _ => None,
        }
    }

    pub fn record_error(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Applies a probe result; returns true when a change armed the prompt.
    pub fn apply_probe(&mut self, result: Result<bool, String>) -> bool {
        match result {
            Ok(changed) => {
                self.last_error = None;
                if changed {
                    self.pending_confirmation = true;
                }
                changed
            }
            Err(message) => {
                self.record_error(message);
                false
            }
        }
    }

    /// Clears the prompt. Returns whether one was showing.
    pub fn resolve_prompt(&mut self) -> bool {
        std::mem::take(&mut self.pending_confirmation)
    }
}

/// `1s`, `1500ms`: the cadence as shown in the status line.
pub fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{millis}ms")
    }
}
