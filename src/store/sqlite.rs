//! Rate table with SQLite backend

use super::RateStore;
use crate::config::is_valid_table_name;
use crate::error::{FxRatesError, Result};
use crate::snapshot::{DatedRates, ExchangeRateSnapshot};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Default table name
pub const DEFAULT_TABLE_NAME: &str = "CurrencyExchangeInfo";

/// Single-table snapshot store.
///
/// Each row holds one currency's snapshot with the dated rates encoded
/// as JSON.
pub struct SqliteRateStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRateStore {
    /// Create or open a database file
    pub fn open(db_path: &Path, table: &str) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| FxRatesError::StoreError(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn, table)
    }

    /// Create in-memory database (for testing)
    pub fn open_in_memory(table: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            FxRatesError::StoreError(format!("Failed to create in-memory database: {}", e))
        })?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        if !is_valid_table_name(table) {
            return Err(FxRatesError::ConfigError(format!(
                "Invalid table name: {}",
                table
            )));
        }

        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        };
        store.create_table()?;
        Ok(store)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    currency_name TEXT PRIMARY KEY,
                    exchange_rates TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                self.table
            ),
            [],
        )
        .map_err(|e| FxRatesError::StoreError(format!("Failed to create {} table: {}", self.table, e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| FxRatesError::StoreError("Database connection lock poisoned".to_string()))
    }

    /// Time of the last write for a currency, as RFC 3339
    pub fn updated_at(&self, currency_name: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!(
                "SELECT updated_at FROM {} WHERE currency_name = ?1",
                self.table
            ),
            params![currency_name],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| FxRatesError::StoreError(format!("Failed to read update time: {}", e)))
    }
}

impl RateStore for SqliteRateStore {
    fn get_snapshot(&self, currency_name: &str) -> Result<Option<ExchangeRateSnapshot>> {
        let conn = self.lock()?;
        let encoded: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT exchange_rates FROM {} WHERE currency_name = ?1",
                    self.table
                ),
                params![currency_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| FxRatesError::StoreError(format!("Failed to get snapshot: {}", e)))?;

        match encoded {
            Some(json) => {
                let exchange_rates: DatedRates = serde_json::from_str(&json)?;
                Ok(Some(ExchangeRateSnapshot {
                    currency_name: currency_name.to_string(),
                    exchange_rates,
                }))
            }
            None => Ok(None),
        }
    }

    fn put_snapshot(&self, snapshot: &ExchangeRateSnapshot) -> Result<()> {
        let encoded = serde_json::to_string(&snapshot.exchange_rates)?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (currency_name, exchange_rates, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(currency_name) DO UPDATE SET
                    exchange_rates = excluded.exchange_rates,
                    updated_at = excluded.updated_at",
                self.table
            ),
            params![&snapshot.currency_name, encoded, Utc::now().to_rfc3339()],
        )
        .map_err(|e| FxRatesError::StoreError(format!("Failed to put snapshot: {}", e)))?;
        Ok(())
    }

    fn delete_snapshot(&self, currency_name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE currency_name = ?1", self.table),
                params![currency_name],
            )
            .map_err(|e| FxRatesError::StoreError(format!("Failed to delete snapshot: {}", e)))?;
        Ok(deleted > 0)
    }

    fn list_currency_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT currency_name FROM {} ORDER BY currency_name",
                self.table
            ))
            .map_err(|e| FxRatesError::StoreError(format!("Failed to prepare query: {}", e)))?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| FxRatesError::StoreError(format!("Failed to list snapshots: {}", e)))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| FxRatesError::StoreError(format!("Failed to read row: {}", e)))?;
        Ok(names)
    }
}
