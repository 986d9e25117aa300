//! Function entry points
//!
//! Three handlers share one table:
//!
//! - [`update_exchange_data`]: poll the feed and write the snapshot
//! - [`daily_exchange_rate`]: most recent rates
//! - [`daily_exchange_rate_behaviour`]: most recent rates and the change
//!   since the previous stored date
//!
//! Each takes the opaque trigger payload it was invoked with and returns a
//! [`FunctionResponse`]. Failures are returned as `Err` to the caller.

use crate::config::{FxConfig, IngestMode};
use crate::error::{FxRatesError, Result};
use crate::feed::{parse_feed, RateFeed};
use crate::rates::{latest_rates, rate_changes};
use crate::snapshot::{ExchangeRateSnapshot, MergeStats};
use crate::store::RateStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Status code and body returned to the invoking environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl FunctionResponse {
    pub fn ok<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_value(body)?,
        })
    }
}

/// Result of an ingest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub currency_name: String,
    pub mode: IngestMode,
    pub dates_in_feed: usize,
    pub dates_stored: usize,
    pub dates_added: usize,
    pub dates_replaced: usize,
    pub dates_expired: usize,
    pub latest_date: Option<String>,
}

/// The deployable functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    UpdateExchangeData,
    DailyExchangeRate,
    DailyExchangeRateBehaviour,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 3] = [
        FunctionKind::UpdateExchangeData,
        FunctionKind::DailyExchangeRate,
        FunctionKind::DailyExchangeRateBehaviour,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FunctionKind::UpdateExchangeData => "UpdateExchangeData",
            FunctionKind::DailyExchangeRate => "DailyExchangeRate",
            FunctionKind::DailyExchangeRateBehaviour => "DailyExchangeRateBehaviour",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FunctionKind {
    type Err = FxRatesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "updateexchangedata" | "ingest" => Ok(FunctionKind::UpdateExchangeData),
            "dailyexchangerate" | "latest" => Ok(FunctionKind::DailyExchangeRate),
            "dailyexchangeratebehaviour" | "delta" => Ok(FunctionKind::DailyExchangeRateBehaviour),
            _ => Err(FxRatesError::UnknownFunction(s.to_string())),
        }
    }
}

/// Invoke a function by kind
pub async fn invoke<F, S>(
    kind: FunctionKind,
    event: &Value,
    feed: &F,
    store: &S,
    config: &FxConfig,
) -> Result<FunctionResponse>
where
    F: RateFeed,
    S: RateStore,
{
    match kind {
        FunctionKind::UpdateExchangeData => update_exchange_data(event, feed, store, config).await,
        FunctionKind::DailyExchangeRate => daily_exchange_rate(event, store, config),
        FunctionKind::DailyExchangeRateBehaviour => {
            daily_exchange_rate_behaviour(event, store, config)
        }
    }
}

fn begin(kind: FunctionKind, event: &Value) -> Uuid {
    let request_id = Uuid::new_v4();
    log::info!("{} request {} started", kind, request_id);
    log::debug!("{} request {} event: {}", kind, request_id, event);
    request_id
}

/// Fetch the feed and write it to the table
pub async fn update_exchange_data<F, S>(
    event: &Value,
    feed: &F,
    store: &S,
    config: &FxConfig,
) -> Result<FunctionResponse>
where
    F: RateFeed,
    S: RateStore,
{
    let request_id = begin(FunctionKind::UpdateExchangeData, event);

    let document = feed.fetch().await?;
    let incoming = parse_feed(&document)?;
    let dates_in_feed = incoming.len();
    log::info!(
        "Request {}: {} dates from {}",
        request_id,
        dates_in_feed,
        feed.name()
    );

    let (mut snapshot, stats) = match config.ingest_mode {
        IngestMode::Replace => {
            let previous = store.get_snapshot(&config.currency_name)?;
            let snapshot = ExchangeRateSnapshot::from_rates(&config.currency_name, incoming)?;
            let replaced = previous
                .map(|p| snapshot.dates().filter(|d| p.rates_on(d).is_some()).count())
                .unwrap_or(0);
            let stats = MergeStats {
                added: snapshot.len() - replaced,
                replaced,
            };
            (snapshot, stats)
        }
        IngestMode::Merge => {
            let mut snapshot = store
                .get_snapshot(&config.currency_name)?
                .unwrap_or_else(|| ExchangeRateSnapshot::new(&config.currency_name));
            let stats = snapshot.merge(incoming)?;
            (snapshot, stats)
        }
    };

    let dates_expired = match config.retention_days {
        Some(days) => snapshot.retain_recent(days)?,
        None => 0,
    };

    store.put_snapshot(&snapshot)?;

    let latest_date = snapshot.ordered_dates()?.first().map(|d| d.to_string());
    let summary = IngestSummary {
        currency_name: snapshot.currency_name.clone(),
        mode: config.ingest_mode,
        dates_in_feed,
        dates_stored: snapshot.len(),
        dates_added: stats.added,
        dates_replaced: stats.replaced,
        dates_expired,
        latest_date,
    };

    log::info!(
        "Request {}: stored {} dates for {} ({} added, {} replaced, {} expired)",
        request_id,
        summary.dates_stored,
        summary.currency_name,
        summary.dates_added,
        summary.dates_replaced,
        summary.dates_expired
    );

    FunctionResponse::ok(&summary)
}

/// Return the most recent stored rates
pub fn daily_exchange_rate<S: RateStore>(
    event: &Value,
    store: &S,
    config: &FxConfig,
) -> Result<FunctionResponse> {
    let request_id = begin(FunctionKind::DailyExchangeRate, event);

    let snapshot = store.require_snapshot(&config.currency_name)?;
    let latest = latest_rates(&snapshot)?;

    log::info!(
        "Request {}: {} rates for {}",
        request_id,
        latest.current_exchange_rates.len(),
        latest.current_date
    );

    FunctionResponse::ok(&latest)
}

/// Return the most recent stored rates and their change since the
/// previous stored date
pub fn daily_exchange_rate_behaviour<S: RateStore>(
    event: &Value,
    store: &S,
    config: &FxConfig,
) -> Result<FunctionResponse> {
    let request_id = begin(FunctionKind::DailyExchangeRateBehaviour, event);

    let snapshot = store.require_snapshot(&config.currency_name)?;
    let changes = rate_changes(&snapshot, config.delta_precision)?;

    log::info!(
        "Request {}: {} changes between {} and {}",
        request_id,
        changes.exchange_rate_change.len(),
        changes.previous_day_date,
        changes.current_date
    );

    FunctionResponse::ok(&changes)
}
