#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP source loader.
//!
//! # Example
//!
//! ```no_run
//! use ingest_core::{DataSourceConfig, SourceLoader, SourceType};
//! use ingest_http::UrlLoader;
//! use std::path::Path;
//!
//! # async fn example() -> ingest_core::Result<()> {
//! let loader = UrlLoader::new()?;
//! let config = DataSourceConfig::new(
//!     "bank_feed",
//!     SourceType::Url,
//!     "https://bank.example.com/api/transactions",
//!     "transaction",
//! );
//! let batch = loader.load(&config, Path::new(".")).await?;
//! println!("Fetched {} rows", batch.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use ingest_core::{DataSourceConfig, IngestError, Result, SourceBatch, SourceLoader, SourceType};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent for HTTP requests.
const USER_AGENT: &str = concat!("ingest-http/", env!("CARGO_PKG_VERSION"));

/// Loader that fetches JSON records over HTTP.
#[derive(Debug, Clone)]
pub struct UrlLoader {
    client: reqwest::Client,
}

impl UrlLoader {
    /// Create a loader with the default timeout.
    ///
    /// # Errors
    /// Returns [`IngestError::Network`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a loader with a custom request timeout.
    ///
    /// # Errors
    /// Returns [`IngestError::Network`] if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a loader using the provided HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceLoader for UrlLoader {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Url
    }

    async fn load(&self, config: &DataSourceConfig, _data_dir: &Path) -> Result<SourceBatch> {
        let url = &config.path_or_url;
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IngestError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| IngestError::Network(e.to_string()))?;
        let batch = ingest_json::parse_document(&body)?;
        debug!(source = %config.name, rows = batch.len(), "Fetched records");
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_info() {
        let loader = UrlLoader::new().unwrap();
        assert_eq!(loader.name(), "HTTP");
        assert_eq!(loader.source_type(), SourceType::Url);
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let loader = UrlLoader::with_timeout(Duration::from_secs(1)).unwrap();
        let config = DataSourceConfig::new("feed", SourceType::Url, "not a url", "transaction");
        let err = loader.load(&config, Path::new(".")).await.unwrap_err();
        assert!(matches!(err, IngestError::Network(_)));
    }
}
