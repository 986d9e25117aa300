//! Latest-rate and day-over-day change queries

use crate::error::{FxRatesError, Result};
use crate::snapshot::{ExchangeRateSnapshot, RateSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal places kept in rate changes
pub const DEFAULT_PRECISION: u32 = 4;

/// Most recent stored rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestRates {
    pub currency_name: String,
    pub current_exchange_rates: RateSet,
    pub current_date: String,
}

/// Most recent stored rates plus the change from the previous stored date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateChanges {
    pub currency_name: String,
    pub current_exchange_rates: RateSet,
    pub current_date: String,
    pub previous_day_date: String,
    pub exchange_rate_change: BTreeMap<String, f64>,
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid reporting "-0.0" for an unchanged rate
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn parse_rate(date: &str, currency: &str, rate: &str) -> Result<f64> {
    rate.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| FxRatesError::InvalidRate {
            date: date.to_string(),
            currency: currency.to_string(),
            rate: rate.to_string(),
        })
}

/// Per-code change between two dated rate sets.
///
/// Codes are paired by name. A code present on only one of the two dates
/// has no change entry.
pub fn changes_between(
    (current_date, current): (&str, &RateSet),
    (previous_date, previous): (&str, &RateSet),
    precision: u32,
) -> Result<BTreeMap<String, f64>> {
    let mut changes = BTreeMap::new();

    for (code, rate) in current {
        let Some(previous_rate) = previous.get(code) else {
            log::warn!(
                "{} has a rate on {} but not on {}; no change reported",
                code,
                current_date,
                previous_date
            );
            continue;
        };

        let now = parse_rate(current_date, code, rate)?;
        let before = parse_rate(previous_date, code, previous_rate)?;
        changes.insert(code.clone(), round_to(now - before, precision));
    }

    for code in previous.keys().filter(|code| !current.contains_key(*code)) {
        log::warn!(
            "{} was quoted on {} but dropped on {}",
            code,
            previous_date,
            current_date
        );
    }

    Ok(changes)
}

/// Rates for the most recent stored date
pub fn latest_rates(snapshot: &ExchangeRateSnapshot) -> Result<LatestRates> {
    let (date, rates) = snapshot.latest()?;
    Ok(LatestRates {
        currency_name: snapshot.currency_name.clone(),
        current_exchange_rates: rates.clone(),
        current_date: date.to_string(),
    })
}

/// Rates for the most recent stored date and the change since the
/// previous stored date. Requires at least two dated entries.
pub fn rate_changes(snapshot: &ExchangeRateSnapshot, precision: u32) -> Result<RateChanges> {
    let (current, previous) = snapshot.latest_two()?;
    let exchange_rate_change = changes_between(current, previous, precision)?;

    Ok(RateChanges {
        currency_name: snapshot.currency_name.clone(),
        current_exchange_rates: current.1.clone(),
        current_date: current.0.to_string(),
        previous_day_date: previous.0.to_string(),
        exchange_rate_change,
    })
}
