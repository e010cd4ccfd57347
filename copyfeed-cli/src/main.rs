//! CopyFeed CLI: print the signal feed and check configuration.
//!
//! Commands:
//! - `feed`: load the feed (backend or fixture), optionally several pages deep
//! - `config check`: parse and validate a config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use copyfeed_core::config::AppConfig;
use copyfeed_core::domain::{Signal, UserId};
use copyfeed_core::feed::{Completion, FeedController};
use copyfeed_core::filter::FilterTag;
use copyfeed_core::logging::{init_logging, LogTarget};
use copyfeed_core::source::{
    CircuitBreaker, InMemorySource, RestSource, RestSourceOptions, SessionProvider, SignalSource,
    StaticSession,
};

#[derive(Parser)]
#[command(
    name = "copyfeed",
    about = "CopyFeed CLI: the copy-trading signal feed from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the signal feed and print it.
    Feed {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Serve signals from a JSON fixture instead of the backend.
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Signed-in user id (overrides [session].user_id).
        #[arg(long)]
        user: Option<String>,

        /// Filter chip: all, long, short, subscribed, followed. Repeatable.
        #[arg(long = "filter")]
        filters: Vec<FilterTag>,

        /// How many pages to load.
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Print signals as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Parse and validate a config file, then print the effective settings.
    Check {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Feed {
            config,
            fixture,
            user,
            filters,
            pages,
            json,
        } => run_feed(config, fixture, user, filters, pages, json),
        Commands::Config { action } => match action {
            ConfigAction::Check { config } => run_config_check(config.as_deref()),
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn run_feed(
    config_path: Option<PathBuf>,
    fixture: Option<PathBuf>,
    user: Option<String>,
    filters: Vec<FilterTag>,
    pages: usize,
    json: bool,
) -> Result<()> {
    if pages == 0 {
        bail!("--pages must be at least 1");
    }

    let config = load_config(config_path.as_deref())?;
    init_logging(&config.logging, LogTarget::Stderr)?;

    let source: Arc<dyn SignalSource> = match &fixture {
        Some(path) => Arc::new(
            InMemorySource::from_json_file(path)
                .with_context(|| format!("failed to load fixture {}", path.display()))?,
        ),
        None => Arc::new(RestSource::new(
            RestSourceOptions::from_config(config.require_backend()?),
            Arc::new(CircuitBreaker::default_backend()),
        )),
    };
    let user = user.map(UserId::new).or_else(|| config.session.user());
    let session: Arc<dyn SessionProvider> = Arc::new(StaticSession::new(user));

    let mut feed = FeedController::new(source, session, &config.feed);

    let first = if filters.is_empty() {
        feed.load_signals(true, false)
    } else {
        feed.set_filters(filters)
    };
    if let Completion::Failed(failure) = first {
        bail!("failed to load signals: {}", failure.message);
    }

    for _ in 1..pages {
        match feed.on_load_more() {
            None => break,
            Some(Completion::Failed(failure)) => {
                bail!("failed to load page {}: {}", feed.state().page() + 1, failure.message);
            }
            Some(_) => {}
        }
    }

    tracing::info!(
        signals = feed.signals().len(),
        page = feed.state().page(),
        has_more = feed.state().has_more(),
        "feed loaded"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(feed.signals())?);
    } else {
        print_table(feed.signals());
        println!();
        println!("{}", feed.state());
    }

    Ok(())
}

fn run_config_check(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;

    match path {
        Some(p) => println!("Config OK: {}", p.display()),
        None => println!("Config OK: built-in defaults"),
    }
    let backend = if config.backend.url.trim().is_empty() {
        "(not configured)".to_string()
    } else {
        config.backend.url.clone()
    };
    println!("  backend.url:              {backend}");
    println!("  backend.timeout_secs:     {}", config.backend.timeout_secs);
    println!("  backend.max_retries:      {}", config.backend.max_retries);
    println!("  feed.page_size:           {}", config.feed.page_size);
    println!("  feed.refresh_notice_secs: {}", config.feed.refresh_notice_secs);
    println!("  feed.missing_user_scope:  {:?}", config.feed.missing_user_scope);
    println!(
        "  session.user_id:          {}",
        config
            .session
            .user()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "(anonymous)".into())
    );
    println!("  logging.level:            {}", config.logging.level);

    Ok(())
}

fn print_table(signals: &[Signal]) {
    if signals.is_empty() {
        println!("No signals.");
        return;
    }

    println!(
        "{:<17} {:<12} {:<5} {:>12} {:>12} {:>12} {:>4} {:<9} {:<12}",
        "Time", "Pair", "Side", "Entry", "Stop", "Target", "Lev", "Status", "Trader"
    );
    println!("{}", "-".repeat(101));
    for s in signals {
        println!(
            "{:<17} {:<12} {:<5} {:>12} {:>12} {:>12} {:>4} {:<9} {:<12}",
            s.signal_time.format("%Y-%m-%d %H:%M").to_string(),
            s.pair,
            s.direction.as_str().to_uppercase(),
            or_dash(s.entry_price.as_deref()),
            or_dash(s.stop_loss.as_deref()),
            or_dash(s.take_profit.as_deref()),
            or_dash(s.leverage.as_deref()),
            s.status.label(),
            s.trader_id.as_str(),
        );
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_flags_parse() {
        let cli = Cli::try_parse_from([
            "copyfeed",
            "feed",
            "--fixture",
            "signals.json",
            "--filter",
            "long",
            "--filter",
            "subscribed",
            "--pages",
            "3",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Feed {
                fixture,
                filters,
                pages,
                json,
                ..
            } => {
                assert_eq!(fixture, Some(PathBuf::from("signals.json")));
                assert_eq!(filters, vec![FilterTag::Long, FilterTag::Subscribed]);
                assert_eq!(pages, 3);
                assert!(json);
            }
            _ => panic!("expected feed command"),
        }
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert!(Cli::try_parse_from(["copyfeed", "feed", "--filter", "sideways"]).is_err());
    }

    #[test]
    fn config_check_parses() {
        let cli = Cli::try_parse_from(["copyfeed", "config", "check", "--config", "a.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Check { config: Some(_) }
            }
        ));
    }

    #[test]
    fn dash_for_missing_values() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("5")), "5");
    }

    #[test]
    fn zero_pages_is_an_error() {
        let err = run_feed(None, None, None, Vec::new(), 0, false).unwrap_err();
        assert!(err.to_string().contains("--pages"));
    }
}
