//! The dashboard state machine.
//!
//! `AppState::update` is a synchronous `(state, event) -> commands` step. It
//! never touches the terminal, the clock or the filesystem: reloads, probes
//! and timers come back in as events and go out as `Command` values that the
//! driver in `terminal` executes.

use crate::coverage::{CounterKind, Report};
use crate::hotkeys::{action_for_key, is_filter_char, Key, NavAction};
use crate::nav::NavigationStack;
use crate::rows::{next_counter, node_counters, visible_rows, FilterState, Row, SortMode};
use crate::viewport::{
    clamp_frame, move_cursor, summary_line_count, visible_row_capacity, window, Geometry,
};
use crate::watch::{TickKind, WatchMode, WatchState, WatchWiring};
use std::ops::Range;
use std::time::Duration;

pub const DEFAULT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConfig {
    pub threshold: f64,
    pub sort: SortMode,
    pub no_color: bool,
    pub watch: WatchMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            sort: SortMode::NameAsc,
            no_color: false,
            watch: WatchMode::Passive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Key(Key),
    Resize { width: u16, height: u16 },
    WatchTick,
    ProbeTick,
    ReloadFinished(Result<Report, String>),
    ProbeFinished(Result<bool, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Reload,
    Probe,
    Schedule { tick: TickKind, after: Duration },
}

#[derive(Debug, Clone)]
pub struct AppState {
    report: Report,
    config: ViewConfig,
    wiring: WatchWiring,
    stack: NavigationStack,
    sort: SortMode,
    counter: CounterKind,
    filter: FilterState,
    geometry: Geometry,
    watch: WatchState,
}

impl AppState {
    pub fn new(report: Report, config: ViewConfig, wiring: WatchWiring) -> Self {
        Self {
            report,
            sort: config.sort,
            watch: WatchState::new(config.watch),
            config,
            wiring,
            stack: NavigationStack::new(),
            counter: CounterKind::Instruction,
            filter: FilterState::default(),
            geometry: Geometry::default(),
        }
    }

    /// Commands to run once before the first event: the first watch tick.
    pub fn init(&self) -> Vec<Command> {
        self.schedule_next().into_iter().collect()
    }

    pub fn update(&mut self, event: Event) -> Vec<Command> {
        let commands = match event {
            Event::Key(key) => self.handle_key(key),
            Event::Resize { width, height } => {
                self.geometry = Geometry { width, height };
                Vec::new()
            }
            Event::WatchTick => self.handle_tick(TickKind::Watch, Command::Reload),
            Event::ProbeTick => self.handle_tick(TickKind::Probe, Command::Probe),
            Event::ReloadFinished(Ok(report)) => {
                self.report = report;
                self.stack.reset();
                self.watch.last_error = None;
                self.watch.pending_confirmation = false;
                Vec::new()
            }
            Event::ReloadFinished(Err(message)) => {
                self.watch.record_error(message);
                Vec::new()
            }
            Event::ProbeFinished(result) => {
                self.watch.apply_probe(result);
                Vec::new()
            }
        };
        self.clamp_current();
        commands
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn wiring(&self) -> &WatchWiring {
        &self.wiring
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn counter(&self) -> CounterKind {
        self.counter
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn watch(&self) -> &WatchState {
        &self.watch
    }

    /// Whether the status block carries a watch line.
    pub fn watch_active(&self) -> bool {
        self.watch.tick_kind(&self.wiring).is_some()
    }

    /// Rows of the current frame after filter and sort.
    pub fn rows(&self) -> Vec<Row> {
        visible_rows(
            &self.report,
            self.stack.current(),
            self.counter,
            &self.filter,
            self.sort,
        )
    }

    /// Lines under the help line: watch status, watch error, reload prompt,
    /// filter prompt.
    pub fn status_line_count(&self) -> usize {
        usize::from(self.watch_active())
            + usize::from(self.watch.last_error.is_some())
            + usize::from(self.watch.pending_confirmation)
            + usize::from(self.filter.active)
    }

    pub fn row_capacity(&self) -> usize {
        let counters = node_counters(&self.report, self.stack.current());
        visible_row_capacity(
            self.geometry.height,
            summary_line_count(counters),
            self.status_line_count(),
        )
    }

    /// Index range into `rows()` that is on screen.
    pub fn visible_window(&self, row_count: usize) -> Range<usize> {
        window(self.stack.current(), row_count, self.row_capacity())
    }

    fn schedule_next(&self) -> Option<Command> {
        self.watch
            .tick_kind(&self.wiring)
            .map(|tick| Command::Schedule {
                tick,
                after: self.wiring.interval,
            })
    }

    /// A tick only acts (and re-arms) when it matches the wired mode.
    fn handle_tick(&self, tick: TickKind, work: Command) -> Vec<Command> {
        match self.schedule_next() {
            Some(next @ Command::Schedule { tick: wired, .. }) if wired == tick => {
                vec![work, next]
            }
            _ => Vec::new(),
        }
    }

    fn handle_key(&mut self, key: Key) -> Vec<Command> {
        if self.filter.active {
            return self.handle_filter_key(key);
        }
        if self.watch.pending_confirmation {
            match key {
                Key::Enter => {
                    self.watch.resolve_prompt();
                    return vec![Command::Reload];
                }
                Key::Esc => {
                    self.watch.resolve_prompt();
                    return Vec::new();
                }
                _ => {}
            }
        }
        let Some(action) = action_for_key(key) else {
            return Vec::new();
        };
        match action {
            NavAction::Quit => return vec![Command::Quit],
            NavAction::MoveUp => self.move_by(-1),
            NavAction::MoveDown => self.move_by(1),
            NavAction::JumpFirst => self.stack.current_mut().reset_position(),
            NavAction::JumpLast => {
                let last = self.rows().len().saturating_sub(1);
                self.stack.current_mut().cursor = last;
            }
            NavAction::Enter => self.enter_selected(),
            NavAction::Back => {
                self.stack.pop();
            }
            NavAction::CycleSort => {
                self.sort = self.sort.next();
                self.stack.current_mut().reset_position();
            }
            NavAction::CycleCounter => {
                self.counter = next_counter(self.counter);
                self.stack.current_mut().reset_position();
            }
            NavAction::StartFilter => {
                self.filter.active = true;
                self.filter.query.clear();
                self.stack.current_mut().reset_position();
            }
        }
        Vec::new()
    }

    fn handle_filter_key(&mut self, key: Key) -> Vec<Command> {
        match key {
            Key::CtrlC => return vec![Command::Quit],
            Key::Enter => self.filter.active = false,
            Key::Esc => {
                self.filter.active = false;
                self.filter.query.clear();
                self.stack.current_mut().reset_position();
            }
            Key::Backspace => {
                self.filter.query.pop();
                self.stack.current_mut().reset_position();
            }
            Key::Char(c) if is_filter_char(c) => {
                self.filter.query.push(c);
                self.stack.current_mut().reset_position();
            }
            _ => {}
        }
        Vec::new()
    }

    fn move_by(&mut self, delta: isize) {
        let row_count = self.rows().len();
        let capacity = self.row_capacity();
        move_cursor(self.stack.current_mut(), delta, row_count, capacity);
    }

    /// Maps the cursor through filter and sort back to the child's index in
    /// the model before pushing.
    fn enter_selected(&mut self) {
        let rows = self.rows();
        let frame = *self.stack.current();
        let Some(row) = rows.get(frame.cursor) else {
            return;
        };
        if let Some(child) = frame.child_at(row.original_index) {
            self.stack.push(child);
        }
    }

    fn clamp_current(&mut self) {
        let row_count = self.rows().len();
        let capacity = self.row_capacity();
        clamp_frame(self.stack.current_mut(), row_count, capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::{AppState, Command, Event, ViewConfig};
    use crate::coverage::{Class, Counter, CounterKind, Method, Package, Report};
    use crate::hotkeys::Key;
    use crate::nav::NodeLevel;
    use crate::rows::SortMode;
    use crate::watch::{TickKind, WatchMode, WatchWiring};
    use std::time::Duration;

    fn package(name: &str, covered: u64, classes: Vec<Class>) -> Package {
        Package {
            name: name.to_string(),
            classes,
            counters: vec![Counter::new(CounterKind::Instruction, 10 - covered, covered)],
        }
    }

    fn class(name: &str, methods: &[&str]) -> Class {
        Class {
            name: name.to_string(),
            methods: methods
                .iter()
                .map(|m| Method {
                    name: m.to_string(),
                    ..Method::default()
                })
                .collect(),
            ..Class::default()
        }
    }

    fn sample() -> Report {
        Report {
            name: "x".to_string(),
            packages: vec![
                package("z-low", 2, vec![class("Zed", &["run"])]),
                package(
                    "a-high",
                    9,
                    vec![class("Beta", &["b1"]), class("Alpha", &["a1", "a2"])],
                ),
            ],
            counters: vec![Counter::new(CounterKind::Instruction, 9, 11)],
        }
    }

    fn names(state: &AppState) -> Vec<String> {
        state.rows().into_iter().map(|r| r.name).collect()
    }

    fn press(state: &mut AppState, keys: &[Key]) -> Vec<Command> {
        keys.iter()
            .flat_map(|key| state.update(Event::Key(*key)))
            .collect()
    }

    fn wired(mode: WatchMode) -> AppState {
        AppState::new(
            sample(),
            ViewConfig {
                watch: mode,
                ..ViewConfig::default()
            },
            WatchWiring {
                has_reload: true,
                has_probe: true,
                interval: Duration::from_millis(250),
            },
        )
    }

    #[test]
    fn enter_maps_sorted_cursor_to_original_child() {
        let mut state = AppState::new(sample(), ViewConfig::default(), WatchWiring::default());
        assert_eq!(names(&state), vec!["a-high", "z-low"]);
        press(&mut state, &[Key::Enter]);
        let frame = *state.stack().current();
        assert_eq!(frame.level, NodeLevel::Package);
        assert_eq!(frame.package_ix, 1);
        assert_eq!(names(&state), vec!["Alpha", "Beta"]);

        press(&mut state, &[Key::Enter]);
        assert_eq!(state.stack().current().class_ix, 1);
        assert_eq!(names(&state), vec!["a1", "a2"]);

        press(&mut state, &[Key::Down, Key::Enter]);
        assert_eq!(state.stack().depth(), 3);
        assert_eq!(state.stack().current().cursor, 1);
    }

    #[test]
    fn back_is_a_no_op_at_root() {
        let mut state = AppState::new(sample(), ViewConfig::default(), WatchWiring::default());
        press(&mut state, &[Key::Char('b'), Key::Backspace]);
        assert_eq!(state.stack().depth(), 1);
        press(&mut state, &[Key::Enter, Key::Backspace]);
        assert_eq!(state.stack().depth(), 1);
    }

    #[test]
    fn sort_counter_and_filter_changes_reset_position() {
        let mut state = AppState::new(sample(), ViewConfig::default(), WatchWiring::default());
        press(&mut state, &[Key::Char('G')]);
        assert_eq!(state.stack().current().cursor, 1);
        press(&mut state, &[Key::Char('s')]);
        assert_eq!(state.sort(), SortMode::CoverageAsc);
        assert_eq!(state.stack().current().cursor, 0);

        press(&mut state, &[Key::Char('G'), Key::Char('c')]);
        assert_eq!(state.counter(), CounterKind::Branch);
        assert_eq!(state.stack().current().cursor, 0);

        press(&mut state, &[Key::Char('G'), Key::Char('/')]);
        assert!(state.filter().active);
        assert_eq!(state.stack().current().cursor, 0);
    }

    #[test]
    fn filter_mode_swallows_navigation_keys() {
        let mut state = AppState::new(sample(), ViewConfig::default(), WatchWiring::default());
        let commands = press(
            &mut state,
            &[Key::Char('/'), Key::Char('q'), Key::Char(' '), Key::Char('z')],
        );
        assert!(commands.is_empty());
        assert_eq!(state.filter().query, "qz");
        assert!(names(&state).is_empty());

        press(&mut state, &[Key::Backspace, Key::Backspace, Key::Char('l')]);
        assert_eq!(names(&state), vec!["z-low"]);
        press(&mut state, &[Key::Enter]);
        assert!(!state.filter().active);
        assert_eq!(state.filter().query, "l");

        press(&mut state, &[Key::Char('/'), Key::Char('a'), Key::Esc]);
        assert_eq!(state.filter().query, "");
        assert_eq!(names(&state).len(), 2);

        assert_eq!(press(&mut state, &[Key::Char('/'), Key::CtrlC]), vec![Command::Quit]);
    }

    #[test]
    fn quit_keys_emit_quit() {
        let mut state = AppState::new(sample(), ViewConfig::default(), WatchWiring::default());
        assert_eq!(press(&mut state, &[Key::Char('q')]), vec![Command::Quit]);
        assert_eq!(press(&mut state, &[Key::CtrlC]), vec![Command::Quit]);
    }

    #[test]
    fn empty_row_sets_are_safe() {
        let mut state = AppState::new(Report::default(), ViewConfig::default(), WatchWiring::default());
        let commands = press(
            &mut state,
            &[Key::Down, Key::Up, Key::Char('G'), Key::Char('g'), Key::Enter, Key::Char('b')],
        );
        assert!(commands.is_empty());
        assert_eq!(state.stack().depth(), 1);
        assert_eq!(state.stack().current().cursor, 0);
    }

    #[test]
    fn resize_reclamps_offset() {
        let packages = (0..40)
            .map(|ix| package(&format!("p{ix:02}"), 5, Vec::new()))
            .collect();
        let report = Report {
            packages,
            ..Report::default()
        };
        let mut state = AppState::new(report, ViewConfig::default(), WatchWiring::default());
        state.update(Event::Resize {
            width: 80,
            height: 12,
        });
        let capacity = state.row_capacity();
        press(&mut state, &[Key::Char('G')]);
        let frame = *state.stack().current();
        assert_eq!(frame.cursor, 39);
        assert_eq!(frame.offset, 40 - capacity);

        state.update(Event::Resize {
            width: 80,
            height: 30,
        });
        let frame = *state.stack().current();
        assert_eq!(frame.cursor, 39);
        assert_eq!(frame.offset, 40 - state.row_capacity());
        assert_eq!(state.stack().depth(), 1);
    }

    #[test]
    fn init_schedules_only_the_wired_tick() {
        let after = Duration::from_millis(250);
        assert_eq!(
            wired(WatchMode::Auto).init(),
            vec![Command::Schedule {
                tick: TickKind::Watch,
                after
            }]
        );
        assert_eq!(
            wired(WatchMode::Passive).init(),
            vec![Command::Schedule {
                tick: TickKind::Probe,
                after
            }]
        );
        assert!(wired(WatchMode::Off).init().is_empty());
        assert!(
            AppState::new(sample(), ViewConfig::default(), WatchWiring::default())
                .init()
                .is_empty()
        );
    }

    #[test]
    fn auto_tick_reloads_and_reschedules() {
        let mut state = wired(WatchMode::Auto);
        let commands = state.update(Event::WatchTick);
        assert_eq!(commands[0], Command::Reload);
        assert!(matches!(
            commands[1],
            Command::Schedule {
                tick: TickKind::Watch,
                ..
            }
        ));
        assert!(state.update(Event::ProbeTick).is_empty());
    }

    #[test]
    fn reload_failure_is_kept_until_a_success() {
        let mut state = wired(WatchMode::Auto);
        press(&mut state, &[Key::Enter]);
        state.update(Event::ReloadFinished(Err("broken xml".to_string())));
        assert_eq!(state.watch().last_error.as_deref(), Some("broken xml"));
        assert_eq!(state.stack().depth(), 2);

        let mut next = sample();
        next.name = "updated".to_string();
        state.update(Event::ReloadFinished(Ok(next)));
        assert_eq!(state.watch().last_error, None);
        assert_eq!(state.report().name, "updated");
        assert_eq!(state.stack().depth(), 1);
    }

    #[test]
    fn passive_prompt_accept_and_reject() {
        let mut state = wired(WatchMode::Passive);
        let commands = state.update(Event::ProbeTick);
        assert_eq!(commands[0], Command::Probe);

        state.update(Event::ProbeFinished(Ok(true)));
        assert!(state.watch().pending_confirmation);
        assert_eq!(press(&mut state, &[Key::Enter]), vec![Command::Reload]);
        assert!(!state.watch().pending_confirmation);
        assert_eq!(state.stack().depth(), 1);

        state.update(Event::ProbeFinished(Ok(true)));
        assert!(press(&mut state, &[Key::Esc]).is_empty());
        assert!(!state.watch().pending_confirmation);
        assert_eq!(state.report(), &sample());
    }

    #[test]
    fn prompt_lets_navigation_keys_through() {
        let mut state = wired(WatchMode::Passive);
        state.update(Event::ProbeFinished(Ok(true)));
        press(&mut state, &[Key::Down]);
        assert_eq!(state.stack().current().cursor, 1);
        assert!(state.watch().pending_confirmation);
        assert_eq!(press(&mut state, &[Key::Char('q')]), vec![Command::Quit]);
    }

    #[test]
    fn status_lines_shrink_capacity() {
        let mut state = wired(WatchMode::Passive);
        let base = state.row_capacity();
        assert_eq!(state.status_line_count(), 1);
        state.update(Event::ProbeFinished(Err("gone".to_string())));
        assert_eq!(state.status_line_count(), 2);
        assert_eq!(state.row_capacity(), base - 1);
        state.update(Event::ProbeFinished(Ok(true)));
        state.update(Event::Key(Key::Char('/')));
        assert_eq!(state.status_line_count(), 3);
    }
}
