//! Upstream rate feed
//!
//! The European Central Bank publishes euro reference rates as an XML
//! document of nested `Cube` elements:
//!
//! ```xml
//! <Cube>
//!   <Cube time="2024-01-05">
//!     <Cube currency="USD" rate="1.0921"/>
//!     <Cube currency="JPY" rate="158.30"/>
//!   </Cube>
//! </Cube>
//! ```
//!
//! - **ecb**: HTTP client for the published documents
//! - **parser**: XML -> dated rate sets
//! - [`FileFeed`]: reads a saved document from disk

pub mod ecb;
pub mod parser;

pub use ecb::{EcbFeed, FeedWindow};
pub use parser::parse_feed;

use crate::error::{FxRatesError, Result};
use std::path::PathBuf;

/// A source of raw feed documents
pub trait RateFeed: Send + Sync {
    /// Fetch the raw XML document
    fn fetch(&self) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Source name used in logs
    fn name(&self) -> &str;
}

/// Feed backed by a document on disk
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
    name: String,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }
}

impl RateFeed for FileFeed {
    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FxRatesError::FeedError(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Feed serving a fixed document
#[derive(Debug, Clone)]
pub struct StaticFeed {
    document: String,
}

impl StaticFeed {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

impl RateFeed for StaticFeed {
    async fn fetch(&self) -> Result<String> {
        Ok(self.document.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
