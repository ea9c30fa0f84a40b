use clap::{Parser, ValueEnum};
use color_eyre::Result;
use crossterm::event::{Event as CEvent, EventStream};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use futures::StreamExt;
use prepgrid::config::Config;
use prepgrid::services::RestClient;
use prepgrid::tui::{App, AppEvent, DataSource};
use prepgrid::{DatasetId, PreparationId};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info};

/// Longest sleep of the event loop when no timer is pending
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Terminal grid for a data preparation server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the preparation server (overrides the config file)
    #[arg(long = "server", value_name = "URL")]
    server: Option<String>,
    /// Dataset to open
    #[arg(long = "dataset", value_name = "ID", conflicts_with = "file")]
    dataset: Option<String>,
    /// Preparation to open on top of the dataset
    #[arg(long = "preparation", value_name = "ID", requires = "dataset")]
    preparation: Option<String>,
    /// Open a local CSV file; transformations are unavailable
    #[arg(long = "file", value_name = "PATH")]
    file: Option<PathBuf>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Log file (defaults to prepgrid.log in the working directory)
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    prepgrid::hooks::install()?;
    prepgrid::logging::init_with(args.log_file.clone(), args.logging.map(Into::into))?;

    let mut config = Config::from_path(args.config.as_ref())?;
    if let Some(server) = args.server {
        config.server_url = server;
    }

    let source = match (args.file, args.dataset) {
        (Some(path), _) => DataSource::Local { path },
        (None, Some(dataset)) => DataSource::Remote {
            client: RestClient::new(&config.server_url)?,
            dataset_id: DatasetId::new(dataset),
            preparation_id: args.preparation.map(PreparationId::new),
        },
        (None, None) => {
            eprintln!("Nothing to open: pass --dataset ID or --file PATH");
            std::process::exit(libc::EXIT_FAILURE);
        }
    };
    info!(server = %config.server_url, ?source, "starting");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut app = App::new(&config, source, events_tx);
    app.load();

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let res = run_app(&mut terminal, &mut app, events_rx).await;

    app.shutdown();
    prepgrid::tui::restore_terminal()?;
    if let Err(e) = &res {
        error!("Error: {e}");
    }
    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut events: UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let mut input = EventStream::new();
    loop {
        let now = Instant::now();
        app.tick(now);
        terminal.draw(|f| app.render(f))?;
        if app.should_quit() {
            return Ok(());
        }

        let sleep = app
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(IDLE_TICK)
            .min(IDLE_TICK);

        tokio::select! {
            maybe_event = input.next() => match maybe_event {
                Some(Ok(CEvent::Key(key))) => app.handle_key_event(key)?,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            Some(event) = events.recv() => app.handle_app_event(event),
            _ = tokio::time::sleep(sleep) => {}
        }
    }
}
