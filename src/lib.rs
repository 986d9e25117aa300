//! # euro-fx-rates
//!
//! Fetch, store, and serve the European Central Bank's euro reference
//! rates.
//!
//! One function polls the ECB XML feed and writes the rates into a
//! key-value table keyed by currency name; two more read the table back and
//! return the most recent rates, or the most recent rates together with
//! their change since the previous stored date.
//!
//! ## Example
//!
//! ```rust,no_run
//! use euro_fx_rates::prelude::*;
//! use serde_json::json;
//!
//! # async fn run() -> euro_fx_rates::error::Result<()> {
//! let config = FxConfig::default();
//! let feed = EcbFeed::for_window(config.feed_window, config.request_timeout())?;
//! let store = InMemoryRateStore::new();
//!
//! update_exchange_data(&json!({}), &feed, &store, &config).await?;
//! let response = daily_exchange_rate_behaviour(&json!({}), &store, &config)?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod functions;
pub mod rates;
pub mod snapshot;
pub mod store;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::config::{FxConfig, IngestMode};
    pub use crate::error::{FxRatesError, Result};
    pub use crate::feed::{EcbFeed, FeedWindow, FileFeed, RateFeed};
    pub use crate::functions::{
        daily_exchange_rate, daily_exchange_rate_behaviour, invoke, update_exchange_data,
        FunctionKind, FunctionResponse, IngestSummary,
    };
    pub use crate::rates::{latest_rates, rate_changes, LatestRates, RateChanges};
    pub use crate::snapshot::{ExchangeRateSnapshot, RateSet};
    pub use crate::store::{InMemoryRateStore, RateStore};
    #[cfg(feature = "rusqlite-support")]
    pub use crate::store::SqliteRateStore;
}
