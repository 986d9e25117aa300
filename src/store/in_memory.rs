//! In-memory rate table

use super::RateStore;
use crate::error::{FxRatesError, Result};
use crate::snapshot::ExchangeRateSnapshot;
use hashbrown::HashMap;
use std::sync::{Arc, RwLock};

/// Process-local rate table
///
/// Clones share the same underlying table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateStore {
    items: Arc<RwLock<HashMap<String, ExchangeRateSnapshot>>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> FxRatesError {
        FxRatesError::StoreError("In-memory table lock poisoned".to_string())
    }
}

impl RateStore for InMemoryRateStore {
    fn get_snapshot(&self, currency_name: &str) -> Result<Option<ExchangeRateSnapshot>> {
        let items = self.items.read().map_err(|_| Self::poisoned())?;
        Ok(items.get(currency_name).cloned())
    }

    fn put_snapshot(&self, snapshot: &ExchangeRateSnapshot) -> Result<()> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        items.insert(snapshot.currency_name.clone(), snapshot.clone());
        Ok(())
    }

    fn delete_snapshot(&self, currency_name: &str) -> Result<bool> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        Ok(items.remove(currency_name).is_some())
    }

    fn list_currency_names(&self) -> Result<Vec<String>> {
        let items = self.items.read().map_err(|_| Self::poisoned())?;
        let mut names: Vec<String> = items.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
