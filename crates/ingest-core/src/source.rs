//! Data source configuration and the loader trait.
//!
//! This module defines:
//!
//! - [`SourceType`] - Supported input formats
//! - [`DataSourceConfig`] - A named, configured origin of raw records
//! - [`SourceBatch`] - Ordered rows produced by one load
//! - [`SourceLoader`] - Base trait for format-specific readers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{IngestError, Result};
use crate::record::RawRecord;

/// Input format of a data source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// A JSON array of objects, or a single object.
    Json,
    /// Comma-separated values with a header row.
    Csv,
    /// One JSON object per line.
    Jsonl,
    /// Deterministic synthetic records.
    Mock,
    /// JSON fetched over HTTP.
    Url,
}

impl SourceType {
    /// Returns the lower-case type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
            Self::Mock => "mock",
            Self::Url => "url",
        }
    }

    /// Returns true if the source reads from the local file system.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::Json | Self::Csv | Self::Jsonl)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            "mock" => Ok(Self::Mock),
            "url" | "api" => Ok(Self::Url),
            other => Err(IngestError::InvalidParameter(format!(
                "unknown source type: {other}"
            ))),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

/// Configuration for one named data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Unique source name.
    pub name: String,
    /// Input format.
    pub source_type: SourceType,
    /// File path (relative to the data directory unless absolute) or URL.
    pub path_or_url: String,
    /// Schema used to validate the records.
    pub schema_name: String,
    /// Disabled sources are skipped by bulk ingestion.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds a cached result stays fresh; `None` means until refreshed.
    #[serde(default)]
    pub refresh_interval: Option<u64>,
}

impl DataSourceConfig {
    /// Creates an enabled source with no refresh interval.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source_type: SourceType,
        path_or_url: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_type,
            path_or_url: path_or_url.into(),
            schema_name: schema_name.into(),
            enabled: true,
            refresh_interval: None,
        }
    }

    /// Sets the refresh interval.
    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval.as_secs());
        self
    }

    /// Sets whether the source takes part in bulk ingestion.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the refresh interval as a [`Duration`].
    #[must_use]
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval.map(Duration::from_secs)
    }

    /// Resolves the configured path against a data directory.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.path_or_url)
    }
}

/// One row produced by a loader.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadedRow {
    /// A decoded raw record.
    Record(RawRecord),
    /// A row or line that could not be decoded.
    Malformed(String),
}

/// Ordered rows produced by one load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceBatch {
    rows: Vec<LoadedRow>,
}

impl SourceBatch {
    /// Creates an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Creates a batch of well-formed records.
    #[must_use]
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self {
            rows: records.into_iter().map(LoadedRow::Record).collect(),
        }
    }

    /// Appends a decoded record.
    pub fn push_record(&mut self, record: RawRecord) {
        self.rows.push(LoadedRow::Record(record));
    }

    /// Appends a row that could not be decoded.
    pub fn push_malformed(&mut self, message: impl Into<String>) {
        self.rows.push(LoadedRow::Malformed(message.into()));
    }

    /// Keeps at most `max` rows.
    pub fn truncate(&mut self, max: usize) {
        self.rows.truncate(max);
    }

    /// Number of rows, including malformed ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of malformed rows.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r, LoadedRow::Malformed(_)))
            .count()
    }

    /// Iterates over the rows.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedRow> {
        self.rows.iter()
    }

    /// Well-formed records only, in order.
    pub fn records(&self) -> impl Iterator<Item = &RawRecord> {
        self.rows.iter().filter_map(|r| match r {
            LoadedRow::Record(record) => Some(record),
            LoadedRow::Malformed(_) => None,
        })
    }
}

impl IntoIterator for SourceBatch {
    type Item = LoadedRow;
    type IntoIter = std::vec::IntoIter<LoadedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl FromIterator<LoadedRow> for SourceBatch {
    fn from_iter<I: IntoIterator<Item = LoadedRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Reader for one [`SourceType`].
///
/// Loaders only decode; coercion and validation are left to the validator.
#[async_trait]
pub trait SourceLoader: Send + Sync + Debug {
    /// Returns the name of this loader (e.g., "JSON file").
    fn name(&self) -> &str;

    /// Returns the source type this loader handles.
    fn source_type(&self) -> SourceType;

    /// Loads raw rows for a configured source.
    ///
    /// Returns an error when the source as a whole cannot be read; individual
    /// undecodable rows are reported as [`LoadedRow::Malformed`].
    async fn load(&self, config: &DataSourceConfig, data_dir: &Path) -> Result<SourceBatch>;
}
