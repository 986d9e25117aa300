//! Error types for euro-fx-rates

use thiserror::Error;

/// Main error type for euro-fx-rates
#[derive(Error, Debug)]
pub enum FxRatesError {
    #[error("Feed error: {0}")]
    FeedError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid date '{date}': expected YYYY-MM-DD")]
    InvalidDate { date: String },

    #[error("Invalid rate for {currency} on {date}: '{rate}'")]
    InvalidRate {
        date: String,
        currency: String,
        rate: String,
    },

    #[error("No snapshot stored for currency: {0}")]
    SnapshotNotFound(String),

    #[error("Snapshot for {0} holds no dated rates")]
    NoRates(String),

    #[error("Insufficient history: required {required} dated entries, available {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for euro-fx-rates operations
pub type Result<T> = std::result::Result<T, FxRatesError>;
