//! fx-rates CLI - Command-line driver for the exchange-rate functions
//!
//! Runs the ingest and query functions locally against a SQLite table.
//!
//! ## Example Usage
//!
//! ```bash
//! # Poll the ECB 90-day feed and store it
//! fx-rates ingest
//!
//! # Ingest a saved document instead of polling
//! fx-rates ingest --file eurofxref-hist-90d.xml --mode replace
//!
//! # Latest rates and day-over-day change
//! fx-rates latest
//! fx-rates delta --precision 6
//!
//! # Invoke a function with a trigger payload and print its raw response
//! fx-rates invoke DailyExchangeRateBehaviour --event event.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use euro_fx_rates::config::{FxConfig, IngestMode};
use euro_fx_rates::error::Result as FxResult;
use euro_fx_rates::feed::{EcbFeed, FeedWindow, FileFeed, RateFeed};
use euro_fx_rates::functions::{self, FunctionKind, FunctionResponse, IngestSummary};
use euro_fx_rates::rates::{LatestRates, RateChanges};
use euro_fx_rates::store::{RateStore, SqliteRateStore};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// fx-rates: ECB euro reference rates
#[derive(Parser)]
#[command(name = "fx-rates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch, store, and serve ECB euro reference rates", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON response bodies
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed and store its rates
    Ingest {
        /// Read the feed document from a file instead of polling
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,

        /// Feed window (daily, 90d, full)
        #[arg(short = 'w', long)]
        window: Option<String>,

        /// Ingest mode (merge, replace)
        #[arg(short = 'm', long)]
        mode: Option<String>,

        /// Show progress while fetching
        #[arg(short = 'p', long)]
        show_progress: bool,
    },

    /// Show the most recent stored rates
    Latest,

    /// Show the most recent rates and their change since the previous date
    Delta {
        /// Decimal places for rate changes
        #[arg(long)]
        precision: Option<u32>,
    },

    /// List stored dates, newest first
    Dates {
        /// Show at most N dates
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Invoke a function by name with a trigger payload
    Invoke {
        /// UpdateExchangeData, DailyExchangeRate or DailyExchangeRateBehaviour
        #[arg(value_name = "FUNCTION")]
        function: String,

        /// JSON file holding the trigger payload
        #[arg(short = 'e', long)]
        event: Option<PathBuf>,

        /// Feed document for UpdateExchangeData instead of polling
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// Show the effective configuration
    Info,
}

/// Either feed the CLI can poll
enum CliFeed {
    Ecb(EcbFeed),
    File(FileFeed),
}

impl CliFeed {
    fn build(file: Option<&Path>, config: &FxConfig) -> FxResult<Self> {
        match file {
            Some(path) => Ok(CliFeed::File(FileFeed::new(path))),
            None => Ok(CliFeed::Ecb(EcbFeed::new(
                config.feed_url(),
                config.request_timeout(),
            )?)),
        }
    }
}

impl RateFeed for CliFeed {
    async fn fetch(&self) -> FxResult<String> {
        match self {
            CliFeed::Ecb(feed) => feed.fetch().await,
            CliFeed::File(feed) => feed.fetch().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            CliFeed::Ecb(feed) => feed.name(),
            CliFeed::File(feed) => feed.name(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = FxConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if cli.verbose {
        println!("{} v{}", "fx-rates".cyan().bold(), env!("CARGO_PKG_VERSION"));
        println!(
            "Database: {}",
            config.database_path.display().to_string().dimmed()
        );
    }

    match cli.command {
        Commands::Ingest {
            file,
            window,
            mode,
            show_progress,
        } => {
            apply_ingest_overrides(&mut config, window.as_deref(), mode.as_deref())?;
            config.validate()?;
            ingest(file.as_deref(), show_progress, cli.json, &config).await
        }

        Commands::Latest => show_latest(cli.json, &config),

        Commands::Delta { precision } => {
            if let Some(precision) = precision {
                config.delta_precision = precision;
            }
            config.validate()?;
            show_delta(cli.json, &config)
        }

        Commands::Dates { limit } => show_dates(limit, &config),

        Commands::Invoke {
            function,
            event,
            file,
        } => invoke_function(&function, event.as_deref(), file.as_deref(), &config).await,

        Commands::Info => show_info(&config),
    }
}

/// Apply `ingest` flags; an explicit `--window` replaces any configured feed URL
fn apply_ingest_overrides(config: &mut FxConfig, window: Option<&str>, mode: Option<&str>) -> FxResult<()> {
    if let Some(window) = window {
        if let Some(url) = config.feed_url.take() {
            log::warn!("--window {} overrides configured feed_url {}", window, url);
        }
        config.feed_window = window.parse::<FeedWindow>()?;
    }
    if let Some(mode) = mode {
        config.ingest_mode = mode.parse::<IngestMode>()?;
    }
    Ok(())
}

fn open_store(config: &FxConfig) -> Result<SqliteRateStore> {
    SqliteRateStore::open(&config.database_path, &config.table_name).with_context(|| {
        format!(
            "Failed to open rate table at {}",
            config.database_path.display()
        )
    })
}

async fn ingest(file: Option<&Path>, show_progress: bool, json: bool, config: &FxConfig) -> Result<()> {
    let feed = CliFeed::build(file, config)?;
    let store = open_store(config)?;

    let spinner = show_progress.then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching {}...", feed.name()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = functions::update_exchange_data(&Value::Null, &feed, &store, config).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let response = result.context("Ingest failed")?;

    if json {
        return print_body(&response);
    }

    let summary: IngestSummary = serde_json::from_value(response.body)?;
    println!(
        "{} Stored {} dates for {} ({} mode)",
        "✓".green().bold(),
        summary.dates_stored,
        summary.currency_name.bright_green(),
        summary.mode
    );
    println!(
        "  {} {}  {} {}  {} {}",
        "Added:".dimmed(),
        summary.dates_added,
        "Replaced:".dimmed(),
        summary.dates_replaced,
        "Expired:".dimmed(),
        summary.dates_expired
    );
    if let Some(latest) = summary.latest_date {
        println!("  {} {}", "Latest:".dimmed(), latest);
    }
    Ok(())
}

fn show_latest(json: bool, config: &FxConfig) -> Result<()> {
    let store = open_store(config)?;
    let response = functions::daily_exchange_rate(&Value::Null, &store, config)?;

    if json {
        return print_body(&response);
    }

    let latest: LatestRates = serde_json::from_value(response.body)?;
    println!(
        "{}",
        format!(
            "{} reference rates for {}",
            latest.currency_name, latest.current_date
        )
        .cyan()
        .bold()
    );
    println!();
    for (code, rate) in &latest.current_exchange_rates {
        println!("  {}  {:>12}", code.bold(), rate);
    }
    Ok(())
}

fn show_delta(json: bool, config: &FxConfig) -> Result<()> {
    let store = open_store(config)?;
    let response = functions::daily_exchange_rate_behaviour(&Value::Null, &store, config)?;

    if json {
        return print_body(&response);
    }

    let changes: RateChanges = serde_json::from_value(response.body)?;
    println!(
        "{}",
        format!(
            "{} reference rates for {} (change since {})",
            changes.currency_name, changes.current_date, changes.previous_day_date
        )
        .cyan()
        .bold()
    );
    println!();

    let width = config.delta_precision as usize;
    for (code, rate) in &changes.current_exchange_rates {
        let change = match changes.exchange_rate_change.get(code) {
            Some(delta) if *delta > 0.0 => format!("{:+.*}", width, delta).green(),
            Some(delta) if *delta < 0.0 => format!("{:+.*}", width, delta).red(),
            Some(delta) => format!("{:.*}", width, delta).normal(),
            None => "n/a".dimmed(),
        };
        println!("  {}  {:>12}  {:>12}", code.bold(), rate, change);
    }
    Ok(())
}

fn show_dates(limit: Option<usize>, config: &FxConfig) -> Result<()> {
    let store = open_store(config)?;
    let snapshot = store.require_snapshot(&config.currency_name)?;
    let dates = snapshot.ordered_dates()?;

    println!(
        "{}",
        format!("{} dates stored for {}", dates.len(), snapshot.currency_name)
            .cyan()
            .bold()
    );
    for date in dates.iter().take(limit.unwrap_or(dates.len())) {
        let count = snapshot.rates_on(date).map(|rates| rates.len()).unwrap_or(0);
        println!("  {}  {} rates", date, count.to_string().dimmed());
    }
    Ok(())
}

async fn invoke_function(
    function: &str,
    event: Option<&Path>,
    file: Option<&Path>,
    config: &FxConfig,
) -> Result<()> {
    let kind: FunctionKind = function.parse()?;
    let event = match event {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read event {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Event {} is not valid JSON", path.display()))?
        }
        None => Value::Object(Default::default()),
    };

    let feed = CliFeed::build(file, config)?;
    let store = open_store(config)?;
    let response = functions::invoke(kind, &event, &feed, &store, config)
        .await
        .with_context(|| format!("{} failed", kind))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn show_info(config: &FxConfig) -> Result<()> {
    println!("{}", "fx-rates Configuration".cyan().bold());
    println!("{}", "======================".cyan());
    println!();
    println!("  {} {}", "Feed URL:".bold(), config.feed_url());
    println!("  {} {}", "Database:".bold(), config.database_path.display());
    println!(
        "  {} {}",
        "Functions:".bold(),
        FunctionKind::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("{}", config.to_toml()?);
    Ok(())
}

fn print_body(response: &FunctionResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = vec!["fx-rates", "info"];
        let _cli = Cli::try_parse_from(args).unwrap();
    }

    #[test]
    fn test_ingest_command() {
        let args = vec![
            "fx-rates",
            "ingest",
            "--file",
            "eurofxref-hist-90d.xml",
            "--mode",
            "replace",
            "--show-progress",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Ingest { file, mode, .. } => {
                assert_eq!(file, Some(PathBuf::from("eurofxref-hist-90d.xml")));
                assert_eq!(mode.as_deref(), Some("replace"));
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_window_flag_overrides_feed_url() {
        let mut config = FxConfig {
            feed_url: Some("http://localhost:8080/rates.xml".to_string()),
            ..FxConfig::default()
        };
        apply_ingest_overrides(&mut config, Some("daily"), Some("replace")).unwrap();
        assert_eq!(config.feed_url, None);
        assert_eq!(config.feed_url(), FeedWindow::Daily.url());
        assert_eq!(config.ingest_mode, IngestMode::Replace);

        let mut config = FxConfig {
            feed_url: Some("http://localhost:8080/rates.xml".to_string()),
            ..FxConfig::default()
        };
        apply_ingest_overrides(&mut config, None, None).unwrap();
        assert_eq!(config.feed_url(), "http://localhost:8080/rates.xml");

        assert!(apply_ingest_overrides(&mut config, Some("weekly"), None).is_err());
    }

    #[test]
    fn test_delta_command() {
        let args = vec!["fx-rates", "--json", "delta", "--precision", "6"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Delta { precision: Some(6) }));
    }

    #[test]
    fn test_invoke_command() {
        let args = vec![
            "fx-rates",
            "invoke",
            "DailyExchangeRate",
            "--event",
            "event.json",
        ];
        let _cli = Cli::try_parse_from(args).unwrap();
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(vec!["fx-rates", "backtest"]).is_err());
    }
}
