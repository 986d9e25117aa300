//! European Central Bank reference-rate feed

use super::RateFeed;
use crate::error::{FxRatesError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const ECB_BASE_URL: &str = "https://www.ecb.europa.eu/stats/eurofxref";

/// Which published document to poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedWindow {
    /// Latest business day only
    #[serde(rename = "daily")]
    Daily,
    /// Rolling 90-day history
    #[default]
    #[serde(rename = "90d")]
    NinetyDays,
    /// Full history since 1999
    #[serde(rename = "full")]
    Full,
}

impl FeedWindow {
    pub fn file_name(&self) -> &'static str {
        match self {
            FeedWindow::Daily => "eurofxref-daily.xml",
            FeedWindow::NinetyDays => "eurofxref-hist-90d.xml",
            FeedWindow::Full => "eurofxref-hist.xml",
        }
    }

    pub fn url(&self) -> String {
        format!("{}/{}", ECB_BASE_URL, self.file_name())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedWindow::Daily => "daily",
            FeedWindow::NinetyDays => "90d",
            FeedWindow::Full => "full",
        }
    }
}

impl fmt::Display for FeedWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedWindow {
    type Err = FxRatesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(FeedWindow::Daily),
            "90d" | "hist-90d" => Ok(FeedWindow::NinetyDays),
            "full" | "hist" => Ok(FeedWindow::Full),
            _ => Err(FxRatesError::ConfigError(format!(
                "Unknown feed window: {} (expected daily, 90d or full)",
                s
            ))),
        }
    }
}

/// HTTP client for the ECB feed
pub struct EcbFeed {
    url: String,
    client: Client,
}

impl EcbFeed {
    /// Create a feed for an explicit URL
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxRatesError::FeedError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create a feed for one of the published windows
    pub fn for_window(window: FeedWindow, timeout: Duration) -> Result<Self> {
        Self::new(window.url(), timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RateFeed for EcbFeed {
    async fn fetch(&self) -> Result<String> {
        log::debug!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FxRatesError::FeedError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FxRatesError::FeedError(format!(
                "ECB feed returned error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| FxRatesError::FeedError(format!("Failed to read response body: {}", e)))
    }

    fn name(&self) -> &str {
        "ecb"
    }
}
