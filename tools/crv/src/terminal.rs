//! Real-terminal driver: owns the screen, the timers and the background
//! reload/probe threads, and feeds everything into `AppState::update`.

use crate::app::{AppState, Command, Event};
use crate::config::AppConfig;
use crate::coverage::Report;
use crate::errors::CrvError;
use crate::hotkeys::Key;
use crate::logging::EventLog;
use crate::report_loader::ReportLoader;
use crate::tui;
use crate::watch::{TickKind, WatchWiring};
use crate::watch_probe::ChangeProbe;
use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

const IDLE_POLL: Duration = Duration::from_millis(250);

fn terminal_err(e: io::Error) -> CrvError {
    CrvError::Terminal(e.to_string())
}

/// Raw mode plus alternate screen, undone on drop.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self, CrvError> {
        enable_raw_mode().map_err(terminal_err)?;
        let mut stdout = io::stdout();
        if let Err(e) = stdout.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(terminal_err(e));
        }
        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                let _ = io::stdout().execute(LeaveAlternateScreen);
                let _ = disable_raw_mode();
                Err(terminal_err(e))
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Translates a crossterm key event; releases and repeats are dropped.
pub fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::CtrlC),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Esc => Some(Key::Esc),
        _ => None,
    }
}

/// Executes controller commands: arms timers and runs one-shot background
/// tasks whose results come back over the channel.
pub struct Dispatcher {
    loader: Option<Arc<dyn ReportLoader>>,
    probe: Option<Arc<dyn ChangeProbe>>,
    timers: Vec<(Instant, TickKind)>,
    tx: UnboundedSender<Event>,
    log: EventLog,
}

impl Dispatcher {
    pub fn new(
        loader: Option<Arc<dyn ReportLoader>>,
        probe: Option<Arc<dyn ChangeProbe>>,
        log: EventLog,
    ) -> (Self, UnboundedReceiver<Event>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                loader,
                probe,
                timers: Vec::new(),
                tx,
                log,
            },
            rx,
        )
    }

    pub fn wiring(&self, interval: Duration) -> WatchWiring {
        WatchWiring {
            has_reload: self.loader.is_some(),
            has_probe: self.probe.is_some(),
            interval,
        }
    }

    /// Runs `commands`; returns false once a `Quit` is seen.
    pub fn execute(&mut self, commands: Vec<Command>, now: Instant) -> bool {
        for command in commands {
            match command {
                Command::Quit => return false,
                Command::Schedule { tick, after } => self.timers.push((now + after, tick)),
                Command::Reload => {
                    if let Some(loader) = &self.loader {
                        let loader = Arc::clone(loader);
                        let tx = self.tx.clone();
                        thread::spawn(move || {
                            let result = loader.load().map_err(|e| e.to_string());
                            let _ = tx.send(Event::ReloadFinished(result));
                        });
                    }
                }
                Command::Probe => {
                    if let Some(probe) = &self.probe {
                        let probe = Arc::clone(probe);
                        let tx = self.tx.clone();
                        thread::spawn(move || {
                            let result = probe.has_changed().map_err(|e| e.to_string());
                            let _ = tx.send(Event::ProbeFinished(result));
                        });
                    }
                }
            }
        }
        true
    }

    /// Removes and returns the tick events whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<Event> {
        let (due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(deadline, _)| *deadline <= now);
        self.timers = pending;
        due.into_iter()
            .map(|(_, tick)| match tick {
                TickKind::Watch => Event::WatchTick,
                TickKind::Probe => Event::ProbeTick,
            })
            .collect()
    }

    /// How long input polling may block before a timer falls due.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        self.timers
            .iter()
            .map(|(deadline, _)| deadline.saturating_duration_since(now))
            .min()
            .map_or(IDLE_POLL, |until| until.min(IDLE_POLL))
    }

    /// Logs `event`, applies it and runs the resulting commands.
    pub fn apply(&mut self, state: &mut AppState, event: Event) -> bool {
        self.observe(&event);
        let commands = state.update(event);
        self.execute(commands, Instant::now())
    }

    fn observe(&self, event: &Event) {
        match event {
            Event::ReloadFinished(Ok(report)) => {
                self.log.reload_succeeded(&report.name, report.packages.len());
            }
            Event::ReloadFinished(Err(error)) => self.log.reload_failed(error),
            Event::ProbeFinished(Ok(true)) => self.log.probe_changed(),
            Event::ProbeFinished(Err(error)) => self.log.probe_failed(error),
            _ => {}
        }
    }
}

/// Drives the dashboard until a quit key. Only terminal setup and drawing
/// failures are returned; reload and probe failures stay on screen.
pub fn run_dashboard(
    report: Report,
    config: &AppConfig,
    loader: Option<Arc<dyn ReportLoader>>,
    probe: Option<Arc<dyn ChangeProbe>>,
) -> Result<(), CrvError> {
    let log = EventLog::new(config.logging.path.as_deref());
    let (mut dispatcher, mut rx) = Dispatcher::new(loader, probe, log.clone());
    let wiring = dispatcher.wiring(config.interval());
    let mut state = AppState::new(report, config.view_config(), wiring);

    let mut ui = TerminalGuard::enter()?;
    let size = ui.terminal.size().map_err(terminal_err)?;
    state.update(Event::Resize {
        width: size.width,
        height: size.height,
    });
    dispatcher.execute(state.init(), Instant::now());

    let result = drive(&mut ui, &mut state, &mut dispatcher, &mut rx);
    log.session_finished();
    result
}

fn drive(
    ui: &mut TerminalGuard,
    state: &mut AppState,
    dispatcher: &mut Dispatcher,
    rx: &mut UnboundedReceiver<Event>,
) -> Result<(), CrvError> {
    loop {
        ui.terminal
            .draw(|frame| tui::draw(frame, state))
            .map_err(terminal_err)?;

        for tick in dispatcher.take_due(Instant::now()) {
            if !dispatcher.apply(state, tick) {
                return Ok(());
            }
        }
        while let Ok(done) = rx.try_recv() {
            if !dispatcher.apply(state, done) {
                return Ok(());
            }
        }

        let timeout = dispatcher.poll_timeout(Instant::now());
        if !event::poll(timeout).map_err(terminal_err)? {
            continue;
        }
        let input = match event::read().map_err(terminal_err)? {
            event::Event::Key(key) => map_key(key).map(Event::Key),
            event::Event::Resize(width, height) => Some(Event::Resize { width, height }),
            _ => None,
        };
        if let Some(input) = input {
            if !dispatcher.apply(state, input) {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{map_key, Dispatcher};
    use crate::app::{AppState, Command, Event, ViewConfig};
    use crate::coverage::Report;
    use crate::errors::CrvError;
    use crate::hotkeys::Key;
    use crate::logging::EventLog;
    use crate::report_loader::ReportLoader;
    use crate::watch::{TickKind, WatchMode};
    use crate::watch_probe::ChangeProbe;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct FixedLoader(Result<Report, CrvError>);

    impl ReportLoader for FixedLoader {
        fn load(&self) -> Result<Report, CrvError> {
            self.0.clone()
        }
    }

    struct AlwaysChanged;

    impl ChangeProbe for AlwaysChanged {
        fn has_changed(&self) -> Result<bool, CrvError> {
            Ok(true)
        }
    }

    #[test]
    fn key_translation_keeps_presses_only() {
        let press = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        assert_eq!(map_key(press), Some(Key::Char('j')));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Some(Key::CtrlC));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Key::Backspace)
        );
        let mut release = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_key(release), None);
        assert_eq!(map_key(KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE)), None);
    }

    #[test]
    fn timers_fire_in_deadline_order_and_bound_polling() {
        let (mut dispatcher, _rx) = Dispatcher::new(None, None, EventLog::disabled());
        let now = Instant::now();
        assert_eq!(dispatcher.poll_timeout(now), Duration::from_millis(250));
        dispatcher.execute(
            vec![Command::Schedule {
                tick: TickKind::Probe,
                after: Duration::from_millis(40),
            }],
            now,
        );
        assert_eq!(dispatcher.poll_timeout(now), Duration::from_millis(40));
        assert!(dispatcher.take_due(now).is_empty());
        assert_eq!(
            dispatcher.take_due(now + Duration::from_millis(40)),
            vec![Event::ProbeTick]
        );
        assert!(dispatcher.take_due(now + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn quit_stops_execution() {
        let (mut dispatcher, _rx) = Dispatcher::new(None, None, EventLog::disabled());
        assert!(!dispatcher.execute(vec![Command::Quit], Instant::now()));
        assert!(dispatcher.execute(vec![Command::Reload, Command::Probe], Instant::now()));
    }

    #[test]
    fn background_reload_result_comes_back_as_an_event() {
        let updated = Report {
            name: "updated".to_string(),
            ..Report::default()
        };
        let loader: Arc<dyn ReportLoader> = Arc::new(FixedLoader(Ok(updated.clone())));
        let (mut dispatcher, mut rx) = Dispatcher::new(Some(loader), None, EventLog::disabled());
        let mut state = AppState::new(
            Report {
                name: "x".to_string(),
                ..Report::default()
            },
            ViewConfig {
                watch: WatchMode::Auto,
                ..ViewConfig::default()
            },
            dispatcher.wiring(Duration::from_secs(1)),
        );
        assert!(dispatcher.apply(&mut state, Event::WatchTick));
        let done = rx.blocking_recv().expect("reload result");
        assert_eq!(done, Event::ReloadFinished(Ok(updated)));
        assert!(dispatcher.apply(&mut state, done));
        assert_eq!(state.report().name, "updated");
    }

    #[test]
    fn background_failures_are_stringified() {
        let loader: Arc<dyn ReportLoader> = Arc::new(FixedLoader(Err(CrvError::ReportParse(
            "lcov.info: no records".to_string(),
        ))));
        let probe: Arc<dyn ChangeProbe> = Arc::new(AlwaysChanged);
        let (mut dispatcher, mut rx) =
            Dispatcher::new(Some(loader), Some(probe), EventLog::disabled());

        dispatcher.execute(vec![Command::Probe], Instant::now());
        assert_eq!(rx.blocking_recv(), Some(Event::ProbeFinished(Ok(true))));

        dispatcher.execute(vec![Command::Reload], Instant::now());
        assert_eq!(
            rx.blocking_recv(),
            Some(Event::ReloadFinished(Err(
                "report parse error: lcov.info: no records".to_string()
            )))
        );
    }
}
