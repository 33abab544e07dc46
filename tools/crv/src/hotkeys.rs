/// Terminal-independent key input. The driver maps crossterm events onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Enter,
    Backspace,
    Esc,
    CtrlC,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Quit,
    MoveUp,
    MoveDown,
    JumpFirst,
    JumpLast,
    Enter,
    Back,
    CycleSort,
    CycleCounter,
    StartFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub keys: &'static str,
    pub action: &'static str,
}

pub const DASHBOARD_BINDINGS: [HotkeyBinding; 8] = [
    HotkeyBinding {
        keys: "↑/↓ or j/k",
        action: "move",
    },
    HotkeyBinding {
        keys: "g/G",
        action: "jump",
    },
    HotkeyBinding {
        keys: "Enter",
        action: "open",
    },
    HotkeyBinding {
        keys: "b",
        action: "back",
    },
    HotkeyBinding {
        keys: "s",
        action: "sort",
    },
    HotkeyBinding {
        keys: "c",
        action: "counter",
    },
    HotkeyBinding {
        keys: "/",
        action: "filter",
    },
    HotkeyBinding {
        keys: "q",
        action: "quit",
    },
];

pub fn action_for_key(key: Key) -> Option<NavAction> {
    match key {
        Key::Char('q') | Key::CtrlC => Some(NavAction::Quit),
        Key::Up | Key::Char('k') => Some(NavAction::MoveUp),
        Key::Down | Key::Char('j') => Some(NavAction::MoveDown),
        Key::Char('g') => Some(NavAction::JumpFirst),
        Key::Char('G') => Some(NavAction::JumpLast),
        Key::Enter => Some(NavAction::Enter),
        Key::Char('b') | Key::Backspace => Some(NavAction::Back),
        Key::Char('s') => Some(NavAction::CycleSort),
        Key::Char('c') => Some(NavAction::CycleCounter),
        Key::Char('/') => Some(NavAction::StartFilter),
        _ => None,
    }
}

/// Characters accepted into the filter query: printable and not whitespace.
pub fn is_filter_char(c: char) -> bool {
    !c.is_control() && !c.is_whitespace()
}

pub fn controls_legend() -> String {
    DASHBOARD_BINDINGS
        .iter()
        .map(|binding| format!("{}: {}", binding.keys, binding.action))
        .collect::<Vec<_>>()
        .join("  ")
}

pub const FILTER_PROMPT_HINT: &str = "(Enter: apply, Esc: clear)";
pub const RELOAD_PROMPT_HINT: &str = "(Enter: reload, Esc: dismiss)";
