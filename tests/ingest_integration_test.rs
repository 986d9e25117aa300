//! Integration tests for the ingest function
//!
//! Runs UpdateExchangeData against saved ECB documents and both table
//! backends.

use euro_fx_rates::config::{FxConfig, IngestMode};
use euro_fx_rates::feed::{FileFeed, StaticFeed};
use euro_fx_rates::functions::{update_exchange_data, IngestSummary};
use euro_fx_rates::store::{InMemoryRateStore, RateStore, SqliteRateStore};
use serde_json::json;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixture(name: &str) -> FileFeed {
    FileFeed::new(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name),
    )
}

fn config(mode: IngestMode) -> FxConfig {
    FxConfig {
        ingest_mode: mode,
        ..FxConfig::default()
    }
}

async fn ingest<S: RateStore>(feed: &FileFeed, store: &S, config: &FxConfig) -> IngestSummary {
    let response = update_exchange_data(&json!({"source": "test"}), feed, store, config)
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    serde_json::from_value(response.body).unwrap()
}

#[tokio::test]
async fn test_ingest_history_document() {
    let store = InMemoryRateStore::new();
    let summary = ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config(IngestMode::Merge)).await;

    assert_eq!(summary.currency_name, "Euro");
    assert_eq!(summary.dates_in_feed, 3);
    assert_eq!(summary.dates_stored, 3);
    assert_eq!(summary.dates_added, 3);
    assert_eq!(summary.dates_replaced, 0);
    assert_eq!(summary.latest_date.as_deref(), Some("2024-01-08"));

    let snapshot = store.require_snapshot("Euro").unwrap();
    assert_eq!(snapshot.rates_on("2024-01-05").unwrap()["GBP"], "0.86120");
    assert_eq!(snapshot.rates_on("2024-01-08").unwrap().len(), 4);
}

#[tokio::test]
async fn test_ingest_is_idempotent_in_both_modes() {
    for mode in [IngestMode::Merge, IngestMode::Replace] {
        let store = InMemoryRateStore::new();
        let feed = fixture("eurofxref-hist-sample.xml");
        let config = config(mode);

        ingest(&feed, &store, &config).await;
        let first = store.require_snapshot("Euro").unwrap();

        let summary = ingest(&feed, &store, &config).await;
        let second = store.require_snapshot("Euro").unwrap();

        assert_eq!(first, second, "mode {}", mode);
        assert_eq!(summary.dates_added, 0);
        assert_eq!(summary.dates_replaced, 3);
    }
}

#[tokio::test]
async fn test_merge_keeps_dates_outside_feed_window() {
    let store = InMemoryRateStore::new();
    let config = config(IngestMode::Merge);

    ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config).await;
    let summary = ingest(&fixture("eurofxref-daily-sample.xml"), &store, &config).await;

    assert_eq!(summary.dates_in_feed, 1);
    assert_eq!(summary.dates_added, 1);
    assert_eq!(summary.dates_stored, 4);
    assert_eq!(summary.latest_date.as_deref(), Some("2024-01-09"));
}

#[tokio::test]
async fn test_replace_overwrites_wholesale() {
    let store = InMemoryRateStore::new();
    let config = config(IngestMode::Replace);

    ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config).await;
    let summary = ingest(&fixture("eurofxref-daily-sample.xml"), &store, &config).await;

    assert_eq!(summary.dates_stored, 1);
    let snapshot = store.require_snapshot("Euro").unwrap();
    assert_eq!(snapshot.dates().collect::<Vec<_>>(), vec!["2024-01-09"]);
}

#[tokio::test]
async fn test_retention_drops_old_dates() {
    let store = InMemoryRateStore::new();
    let config = FxConfig {
        retention_days: Some(3),
        ..FxConfig::default()
    };

    let summary = ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config).await;

    // 2024-01-08 minus 3 days keeps 01-05 and 01-08
    assert_eq!(summary.dates_expired, 1);
    assert_eq!(summary.dates_stored, 2);
    assert!(store.require_snapshot("Euro").unwrap().rates_on("2024-01-04").is_none());
}

#[tokio::test]
async fn test_ingest_into_sqlite_table() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested").join("rates.db");
    let config = FxConfig {
        database_path: db_path.clone(),
        ..FxConfig::default()
    };

    {
        let store = SqliteRateStore::open(&db_path, &config.table_name).unwrap();
        ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config).await;
    }

    let reopened = SqliteRateStore::open(&db_path, &config.table_name).unwrap();
    let snapshot = reopened.require_snapshot("Euro").unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.rates_on("2024-01-04").unwrap()["USD"], "1.0953");
}

#[tokio::test]
async fn test_custom_currency_name_and_table() {
    let store = SqliteRateStore::open_in_memory("RatesTest").unwrap();
    let config = FxConfig {
        currency_name: "EuroTest".to_string(),
        table_name: "RatesTest".to_string(),
        ..FxConfig::default()
    };

    ingest(&fixture("eurofxref-daily-sample.xml"), &store, &config).await;
    assert_eq!(store.list_currency_names().unwrap(), vec!["EuroTest".to_string()]);
    assert!(store.get_snapshot("Euro").unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_feed_fails() {
    let store = InMemoryRateStore::new();
    let feed = StaticFeed::new(r#"<Cube><Cube time="2024-01-05"><Cube currency="USD"/></Cube></Cube>"#);

    let result = update_exchange_data(&json!({}), &feed, &store, &FxConfig::default()).await;
    assert!(result.is_err());
    assert!(store.get_snapshot("Euro").unwrap().is_none());
}

#[tokio::test]
async fn test_missing_feed_file_fails() {
    let store = InMemoryRateStore::new();
    let result = update_exchange_data(
        &json!({}),
        &fixture("does-not-exist.xml"),
        &store,
        &FxConfig::default(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_truncated_or_empty_feed_keeps_stored_snapshot() {
    let bodies = [
        r#"<Cube><Cube time="2024-01-05"><Cube currency="USD" rate="1.11"/>"#,
        "",
    ];

    for mode in [IngestMode::Merge, IngestMode::Replace] {
        let store = InMemoryRateStore::new();
        let config = config(mode);
        ingest(&fixture("eurofxref-hist-sample.xml"), &store, &config).await;
        let before = store.require_snapshot("Euro").unwrap();

        for body in bodies {
            let result = update_exchange_data(&json!({}), &StaticFeed::new(body), &store, &config).await;
            assert!(result.is_err(), "mode {} accepted {:?}", mode, body);
            assert_eq!(store.require_snapshot("Euro").unwrap(), before, "mode {}", mode);
        }
    }
}
