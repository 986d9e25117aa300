//! Exchange-rate snapshot data model
//!
//! A snapshot is the full set of rate observations stored for one currency
//! name: `date -> (currency code -> decimal rate string)`. Dates are kept as
//! `YYYY-MM-DD` strings, exactly as published, and are ordered by their
//! parsed calendar value whenever recency matters.

use crate::error::{FxRatesError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Date format used by the feed and the store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Currency code -> decimal rate string for one date
pub type RateSet = BTreeMap<String, String>;

/// Date string -> rate set
pub type DatedRates = BTreeMap<String, RateSet>;

/// Parse a stored date key
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| FxRatesError::InvalidDate {
        date: date.to_string(),
    })
}

/// Outcome of merging feed dates into a stored snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub added: usize,
    pub replaced: usize,
}

/// All exchange-rate observations stored for a currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateSnapshot {
    pub currency_name: String,
    pub exchange_rates: DatedRates,
}

impl ExchangeRateSnapshot {
    /// Create an empty snapshot
    pub fn new(currency_name: impl Into<String>) -> Self {
        Self {
            currency_name: currency_name.into(),
            exchange_rates: DatedRates::new(),
        }
    }

    /// Create a snapshot from already-keyed rates, validating every date
    pub fn from_rates(currency_name: impl Into<String>, exchange_rates: DatedRates) -> Result<Self> {
        let snapshot = Self {
            currency_name: currency_name.into(),
            exchange_rates,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that every date key parses as a calendar date
    pub fn validate(&self) -> Result<()> {
        for date in self.exchange_rates.keys() {
            parse_date(date)?;
        }
        Ok(())
    }

    /// Number of dated entries
    pub fn len(&self) -> usize {
        self.exchange_rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchange_rates.is_empty()
    }

    /// Date keys in storage order
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.exchange_rates.keys().map(String::as_str)
    }

    /// Rates stored for a single date
    pub fn rates_on(&self, date: &str) -> Option<&RateSet> {
        self.exchange_rates.get(date)
    }

    /// Date keys sorted newest first by calendar value
    pub fn ordered_dates(&self) -> Result<Vec<&str>> {
        let mut dated = self
            .exchange_rates
            .keys()
            .map(|key| parse_date(key).map(|date| (date, key.as_str())))
            .collect::<Result<Vec<_>>>()?;

        dated.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(dated.into_iter().map(|(_, key)| key).collect())
    }

    /// Newest `count` entries, newest first; fails if fewer are stored
    pub fn newest(&self, count: usize) -> Result<Vec<(&str, &RateSet)>> {
        if self.exchange_rates.len() < count {
            return Err(FxRatesError::InsufficientHistory {
                required: count,
                available: self.exchange_rates.len(),
            });
        }

        let ordered = self.ordered_dates()?;
        Ok(ordered
            .into_iter()
            .take(count)
            .filter_map(|date| self.exchange_rates.get(date).map(|rates| (date, rates)))
            .collect())
    }

    /// The most recent dated entry
    pub fn latest(&self) -> Result<(&str, &RateSet)> {
        if self.is_empty() {
            return Err(FxRatesError::NoRates(self.currency_name.clone()));
        }
        self.newest(1)?
            .into_iter()
            .next()
            .ok_or_else(|| FxRatesError::NoRates(self.currency_name.clone()))
    }

    /// The two most recent dated entries as `(current, previous)`
    pub fn latest_two(&self) -> Result<((&str, &RateSet), (&str, &RateSet))> {
        let mut newest = self.newest(2)?.into_iter();
        match (newest.next(), newest.next()) {
            (Some(current), Some(previous)) => Ok((current, previous)),
            _ => Err(FxRatesError::InsufficientHistory {
                required: 2,
                available: self.len(),
            }),
        }
    }

    /// Upsert incoming dates. A date already present has its whole rate set
    /// replaced; codes are never merged within a date.
    pub fn merge(&mut self, incoming: DatedRates) -> Result<MergeStats> {
        let mut stats = MergeStats::default();
        for (date, rates) in incoming {
            parse_date(&date)?;
            match self.exchange_rates.insert(date, rates) {
                Some(_) => stats.replaced += 1,
                None => stats.added += 1,
            }
        }
        Ok(stats)
    }

    /// Drop entries older than `days` before the newest stored date.
    /// Returns the number of entries removed.
    pub fn retain_recent(&mut self, days: u32) -> Result<usize> {
        let newest = match self.ordered_dates()?.first() {
            Some(date) => parse_date(date)?,
            None => return Ok(0),
        };
        // A window reaching before the earliest representable date keeps everything
        let Some(cutoff) = Duration::try_days(i64::from(days))
            .and_then(|window| newest.checked_sub_signed(window))
        else {
            return Ok(0);
        };

        let before = self.exchange_rates.len();
        // Keys were all validated by ordered_dates above.
        self.exchange_rates
            .retain(|date, _| parse_date(date).map(|d| d >= cutoff).unwrap_or(true));
        Ok(before - self.exchange_rates.len())
    }
}
