//! Error types for ingestion operations.
//!
//! This module defines [`IngestError`] which covers configuration mistakes,
//! load failures and cache failures. Per-record validation problems are not
//! errors: they are reported through validation outcomes instead.

use thiserror::Error;

/// Errors that can occur while loading, validating, caching or exporting records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No data source is registered under the given name.
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    /// No schema is registered under the given name.
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// The requested export format is not supported.
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The source has no cached records to serve or export.
    #[error("No cached data for source: {0}")]
    NoCachedData(String),

    /// No loader is configured for the source type.
    #[error("No loader configured for source type: {0}")]
    LoaderNotConfigured(String),

    /// File system errors (missing file, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(String),

    /// The source content could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network-related errors (connection failures, HTTP status, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl IngestError {
    /// Returns true for configuration-class errors.
    ///
    /// These are surfaced to the caller immediately and never folded into an
    /// ingestion result.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_)
                | Self::SchemaNotFound(_)
                | Self::UnsupportedFormat(_)
                | Self::NoCachedData(_)
                | Self::LoaderNotConfigured(_)
        )
    }
}

/// Result type alias using [`IngestError`].
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(IngestError::SourceNotFound("x".into()).is_configuration());
        assert!(IngestError::SchemaNotFound("x".into()).is_configuration());
        assert!(IngestError::UnsupportedFormat("xml".into()).is_configuration());
        assert!(!IngestError::Io("missing".into()).is_configuration());
        assert!(!IngestError::Parse("bad".into()).is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = IngestError::SourceNotFound("transactions".into());
        assert_eq!(err.to_string(), "Data source not found: transactions");
    }
}
