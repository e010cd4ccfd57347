//! CopyFeed TUI: the trading-signal feed in a terminal.
//!
//! Filter chips across the top, the signal table in the middle, load state
//! and hints at the bottom. Remote calls run on a background worker so the
//! screen keeps redrawing while pages load.

mod app;
mod input;
mod theme;
mod ui;
mod worker;

use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use copyfeed_core::config::AppConfig;
use copyfeed_core::domain::UserId;
use copyfeed_core::feed::{CancelToken, FeedState};
use copyfeed_core::logging::{init_logging, LogTarget};
use copyfeed_core::source::{
    CircuitBreaker, InMemorySource, RestSource, RestSourceOptions, SessionProvider, SignalSource,
    StaticSession,
};

use crate::app::AppState;
use crate::worker::{FeedBackend, WorkerCommand};

#[derive(Parser)]
#[command(name = "copyfeed-tui", about = "Browse the copy-trading signal feed", version)]
struct Cli {
    /// Config file (defaults to <config dir>/copyfeed/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve signals from a JSON fixture instead of the backend
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Signed-in user id (overrides [session].user_id)
    #[arg(long)]
    user: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_path = config.logging.file.clone().unwrap_or_else(default_log_path);
    init_logging(&config.logging, LogTarget::File(log_path.clone()))
        .with_context(|| format!("failed to set up logging at {}", log_path.display()))?;

    let cancel = CancelToken::new();
    let source = open_source(&config, cli.fixture.as_deref(), &cancel)?;
    let user = cli.user.map(UserId::new).or_else(|| config.session.user());
    let user_label = user.as_ref().map(|u| u.to_string());
    let session: Arc<dyn SessionProvider> = Arc::new(StaticSession::new(user));
    tracing::info!(
        source = source.name(),
        user = user_label.as_deref().unwrap_or("-"),
        page_size = config.feed.page_size,
        "starting feed screen"
    );

    // Install a panic hook that restores the terminal before printing the panic.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
        default_hook(info);
    }));

    // Worker channels
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();

    let backend = FeedBackend {
        source: source.clone(),
        session,
        fallback: config.feed.missing_user_scope,
    };
    let worker_handle = worker::spawn_worker(cmd_rx, resp_tx, backend, cancel.clone());

    let mut app = AppState::new(
        FeedState::from_config(&config.feed),
        cmd_tx,
        resp_rx,
        cancel,
        source.name().to_string(),
        user_label,
    );
    app.start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);

    // Shutdown worker. Cancelling stops retries and backoff; a request already
    // on the wire may outlive the grace period and is left to die with the
    // process.
    app.shutdown();
    if wait_for_worker(&worker_handle, WORKER_GRACE) {
        let _ = worker_handle.join();
    } else {
        tracing::warn!("worker still busy at exit; not waiting for it");
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("feed screen closed");
    result
}

/// How long quitting waits for the worker to notice cancellation.
const WORKER_GRACE: Duration = Duration::from_millis(500);

fn wait_for_worker(handle: &JoinHandle<()>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    true
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        let now = Instant::now();

        // 1. Drain worker responses (non-blocking)
        app.drain_worker(now);
        app.tick(now);

        // 2. Render
        terminal.draw(|f| ui::draw(f, app, now))?;

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => AppConfig::from_file(path)?,
        None => {
            let default = default_config_path();
            if default.exists() {
                AppConfig::from_file(&default)?
            } else {
                AppConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides()?)
}

fn open_source(
    config: &AppConfig,
    fixture: Option<&Path>,
    cancel: &CancelToken,
) -> Result<Arc<dyn SignalSource>> {
    if let Some(path) = fixture {
        let source = InMemorySource::from_json_file(path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?;
        return Ok(Arc::new(source));
    }

    let backend = config.require_backend()?;
    let breaker = Arc::new(CircuitBreaker::default_backend());
    Ok(Arc::new(
        RestSource::new(RestSourceOptions::from_config(backend), breaker)
            .with_cancel(cancel.clone()),
    ))
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("copyfeed")
}

fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

fn default_log_path() -> PathBuf {
    app_dir().join("copyfeed-tui.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "copyfeed-tui",
            "--fixture",
            "signals.json",
            "--user",
            "u1",
        ])
        .unwrap();
        assert_eq!(cli.fixture, Some(PathBuf::from("signals.json")));
        assert_eq!(cli.user.as_deref(), Some("u1"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn missing_backend_without_fixture_is_an_error() {
        let err = open_source(&AppConfig::default(), None, &CancelToken::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("backend url"));
    }

    #[test]
    fn worker_wait_gives_up_after_grace() {
        let (tx, rx) = mpsc::channel::<()>();
        let busy = std::thread::spawn(move || {
            let _ = rx.recv();
        });
        assert!(!wait_for_worker(&busy, Duration::from_millis(30)));

        drop(tx);
        assert!(wait_for_worker(&busy, Duration::from_secs(5)));
        busy.join().unwrap();
    }

    #[test]
    fn default_paths_share_the_app_dir() {
        assert_eq!(default_config_path().parent(), default_log_path().parent());
    }
}
