//! Key-value rate table
//!
//! Snapshots are addressed by currency name. Two backends are provided:
//!
//! - **in_memory**: process-local table, used by tests and dry runs
//! - **sqlite**: durable single-table store (feature `rusqlite-support`)

pub mod in_memory;
#[cfg(feature = "rusqlite-support")]
pub mod sqlite;

pub use in_memory::InMemoryRateStore;
#[cfg(feature = "rusqlite-support")]
pub use sqlite::SqliteRateStore;

use crate::error::{FxRatesError, Result};
use crate::snapshot::ExchangeRateSnapshot;

/// Storage for exchange-rate snapshots keyed by currency name
pub trait RateStore: Send + Sync {
    /// Load the snapshot for a currency, if one is stored
    fn get_snapshot(&self, currency_name: &str) -> Result<Option<ExchangeRateSnapshot>>;

    /// Write a snapshot, replacing any stored under the same currency name
    fn put_snapshot(&self, snapshot: &ExchangeRateSnapshot) -> Result<()>;

    /// Remove a snapshot. Returns whether one was stored.
    fn delete_snapshot(&self, currency_name: &str) -> Result<bool>;

    /// Currency names with a stored snapshot
    fn list_currency_names(&self) -> Result<Vec<String>>;

    /// Load a snapshot that must exist
    fn require_snapshot(&self, currency_name: &str) -> Result<ExchangeRateSnapshot> {
        self.get_snapshot(currency_name)?
            .ok_or_else(|| FxRatesError::SnapshotNotFound(currency_name.to_string()))
    }
}
