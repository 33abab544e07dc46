pub mod app;
pub mod compact;
pub mod config;
pub mod coverage;
pub mod errors;
pub mod hotkeys;
pub mod jacoco;
pub mod lcov;
pub mod logging;
pub mod nav;
pub mod report_loader;
pub mod rows;
pub mod runtime;
pub mod terminal;
pub mod tui;
pub mod viewport;
pub mod watch;
pub mod watch_probe;

use clap::{error::ErrorKind, Parser, ValueEnum};
use config::{load_config, AppConfig, CliOverrides};
use coverage::Report;
use errors::CrvError;
use logging::EventLog;
use report_loader::{FileReportLoader, ReportFormat, ReportLoader};
use runtime::{FileSystem, ProductionFileSystem};
use std::path::PathBuf;
use std::sync::Arc;
use watch::WatchMode;
use watch_probe::{ChangeProbe, ReportUpdateProbe};

#[derive(Debug, Clone, Parser)]
#[command(name = "crv", version)]
#[command(about = "Interactive terminal viewer for code coverage reports")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Coverage percentage at or above which rows are not flagged
    #[arg(short = 't', long)]
    pub threshold: Option<f64>,
    #[arg(short = 's', long, value_enum)]
    pub sort: Option<CliSort>,
    /// Reload automatically whenever the report changes
    #[arg(long, default_value_t = false, conflicts_with = "no_watch")]
    pub watch: bool,
    /// Disable change detection entirely
    #[arg(long, default_value_t = false)]
    pub no_watch: bool,
    #[arg(long, default_value_t = false)]
    pub no_color: bool,
    /// Report format; `auto` detects it from each file's contents
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<CliFormat>,
    /// Append session events to this JSONL file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Coverage report files (JaCoCo XML, LCOV tracefile or JSON model dump); several are merged
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliSort {
    Name,
    Coverage,
}

impl CliSort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Coverage => "coverage",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliFormat {
    Auto,
    Jacoco,
    Lcov,
    Json,
}

impl From<CliFormat> for ReportFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Auto => Self::Auto,
            CliFormat::Jacoco => Self::Jacoco,
            CliFormat::Lcov => Self::Lcov,
            CliFormat::Json => Self::Json,
        }
    }
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            config_path: cli.config.clone(),
            threshold: cli.threshold,
            sort: cli.sort.map(|sort| sort.as_str().to_string()),
            format: cli.format.map(ReportFormat::from),
            watch: cli.watch,
            no_watch: cli.no_watch,
            no_color: cli.no_color,
            log_file: cli.log_file.clone(),
        }
    }
}

/// Everything the dashboard needs, resolved before the terminal is touched.
pub struct Session {
    pub config: AppConfig,
    pub paths: Vec<PathBuf>,
    pub report: Report,
    pub loader: Option<Arc<dyn ReportLoader>>,
    pub probe: Option<Arc<dyn ChangeProbe>>,
}

/// Resolves config, loads the initial report and wires the collaborators the
/// configured watch mode uses: none when off, the loader in auto mode, the
/// loader and a change probe in passive mode.
pub fn prepare_session(cli: &Cli, fs: Arc<dyn FileSystem>) -> Result<Session, CrvError> {
    let config = load_config(&CliOverrides::from(cli), fs.as_ref())?;
    let loader = FileReportLoader::new(cli.paths.clone(), Arc::clone(&fs))
        .with_format(config.report.format);
    let report = loader.load()?;

    let (loader, probe): (Option<Arc<dyn ReportLoader>>, Option<Arc<dyn ChangeProbe>>) =
        match config.watch.mode {
            WatchMode::Off => (None, None),
            WatchMode::Auto => (Some(Arc::new(loader)), None),
            WatchMode::Passive => {
                let probe = ReportUpdateProbe::new(cli.paths.clone(), fs)?;
                (Some(Arc::new(loader)), Some(Arc::new(probe)))
            }
        };

    Ok(Session {
        config,
        paths: cli.paths.clone(),
        report,
        loader,
        probe,
    })
}

pub fn run() -> Result<i32, CrvError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    run_with_runtime(&args, Arc::new(ProductionFileSystem))
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    fs: Arc<dyn FileSystem>,
) -> Result<i32, CrvError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => {
                eprint!("{error}");
                return Ok(2);
            }
        },
    };

    let session = prepare_session(&cli, fs)?;
    let log = EventLog::new(session.config.logging.path.as_deref());
    log.session_started(&session.paths, session.config.watch.mode.as_str());

    terminal::run_dashboard(
        session.report,
        &session.config,
        session.loader,
        session.probe,
    )?;
    Ok(0)
}
