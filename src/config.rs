//! Runtime configuration
//!
//! Values are resolved in order: built-in defaults, a TOML file (an
//! explicit path, or `~/.euro-fx-rates/config.toml` when present), then
//! `FX_RATES_*` environment variables.
//!
//! ```toml
//! currency_name = "Euro"
//! table_name = "CurrencyExchangeInfo"
//! feed_window = "90d"
//! ingest_mode = "merge"
//! retention_days = 365
//! delta_precision = 4
//! database_path = "/var/lib/fx-rates/rates.db"
//! ```

use crate::error::{FxRatesError, Result};
use crate::feed::FeedWindow;
use crate::rates::DEFAULT_PRECISION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "FX_RATES_";
const MAX_PRECISION: u32 = 10;
const MAX_RETENTION_DAYS: u32 = 36_500;

/// How an ingest run writes feed dates into the stored snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Upsert feed dates, keeping stored dates the feed no longer lists
    #[default]
    Merge,
    /// Overwrite the stored snapshot with the feed contents
    Replace,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Merge => "merge",
            IngestMode::Replace => "replace",
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IngestMode {
    type Err = FxRatesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(IngestMode::Merge),
            "replace" => Ok(IngestMode::Replace),
            _ => Err(FxRatesError::ConfigError(format!(
                "Unknown ingest mode: {} (expected merge or replace)",
                s
            ))),
        }
    }
}

/// Function and store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxConfig {
    /// Table key the snapshot is stored under
    #[serde(default = "default_currency_name")]
    pub currency_name: String,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default)]
    pub feed_window: FeedWindow,
    /// Overrides the URL derived from `feed_window`
    #[serde(default)]
    pub feed_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub ingest_mode: IngestMode,
    /// Dates older than this many days before the newest stored date are
    /// dropped on ingest
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default = "default_precision")]
    pub delta_precision: u32,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_currency_name() -> String {
    "Euro".to_string()
}

fn default_table_name() -> String {
    "CurrencyExchangeInfo".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

/// `~/.euro-fx-rates`
pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".euro-fx-rates")
}

fn default_database_path() -> PathBuf {
    default_config_dir().join("rates.db")
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            currency_name: default_currency_name(),
            table_name: default_table_name(),
            feed_window: FeedWindow::default(),
            feed_url: None,
            request_timeout_secs: default_timeout_secs(),
            ingest_mode: IngestMode::default(),
            retention_days: None,
            delta_precision: default_precision(),
            database_path: default_database_path(),
        }
    }
}

impl FxConfig {
    /// Resolve configuration from file and environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_dir().join("config.toml");
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            FxRatesError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| FxRatesError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FxRatesError::ConfigError(format!("Failed to encode config: {}", e)))
    }

    /// Apply `FX_RATES_*` overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("CURRENCY_NAME") {
            self.currency_name = value;
        }
        if let Some(value) = var("TABLE_NAME") {
            self.table_name = value;
        }
        if let Some(value) = var("FEED_WINDOW") {
            self.feed_window = value.parse()?;
        }
        if let Some(value) = var("FEED_URL") {
            self.feed_url = Some(value);
        }
        if let Some(value) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("INGEST_MODE") {
            self.ingest_mode = value.parse()?;
        }
        if let Some(value) = var("RETENTION_DAYS") {
            self.retention_days = Some(parse_number("RETENTION_DAYS", &value)?);
        }
        if let Some(value) = var("DELTA_PRECISION") {
            self.delta_precision = parse_number("DELTA_PRECISION", &value)?;
        }
        if let Some(value) = var("DATABASE_PATH") {
            self.database_path = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency_name.trim().is_empty() {
            return Err(FxRatesError::ConfigError(
                "currency_name must not be empty".to_string(),
            ));
        }
        if !is_valid_table_name(&self.table_name) {
            return Err(FxRatesError::ConfigError(format!(
                "table_name must be a plain identifier, got: {}",
                self.table_name
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(FxRatesError::ConfigError(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if let Some(days) = self.retention_days {
            if days > MAX_RETENTION_DAYS {
                return Err(FxRatesError::ConfigError(format!(
                    "retention_days must be at most {}, got: {}",
                    MAX_RETENTION_DAYS, days
                )));
            }
        }
        if self.delta_precision > MAX_PRECISION {
            return Err(FxRatesError::ConfigError(format!(
                "delta_precision must be at most {}, got: {}",
                MAX_PRECISION, self.delta_precision
            )));
        }
        Ok(())
    }

    /// URL to poll
    pub fn feed_url(&self) -> String {
        self.feed_url
            .clone()
            .unwrap_or_else(|| self.feed_window.url())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        FxRatesError::ConfigError(format!("{}{} is not a number: {}", ENV_PREFIX, name, value))
    })
}

/// Check that a table name is a plain SQL identifier
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
