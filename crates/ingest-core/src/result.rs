//! Ingestion status and result types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceType;

/// Terminal status of one ingestion run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    /// Every record was valid (or there were no records).
    Completed,
    /// Some records were valid and some were not.
    Partial,
    /// No record was valid, or the source could not be loaded.
    Failed,
}

impl IngestionStatus {
    /// Derives the status from record counts.
    ///
    /// `Failed` iff nothing succeeded out of a non-empty batch, `Partial` iff
    /// both successes and failures occurred, `Completed` otherwise.
    #[must_use]
    pub const fn from_counts(successful: usize, failed: usize) -> Self {
        let total = successful + failed;
        if successful == 0 && total > 0 {
            Self::Failed
        } else if failed > 0 {
            Self::Partial
        } else {
            Self::Completed
        }
    }

    /// Returns the lower-case status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the records of a result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrigin {
    /// Freshly read from a file.
    File,
    /// Served from the cache without loading or validating.
    Cache,
    /// Produced by the synthetic generator.
    Mock,
    /// Fetched over HTTP.
    Url,
}

impl ResultOrigin {
    /// Origin of a fresh load from the given source type.
    #[must_use]
    pub const fn for_source_type(source_type: SourceType) -> Self {
        match source_type {
            SourceType::Json | SourceType::Csv | SourceType::Jsonl => Self::File,
            SourceType::Mock => Self::Mock,
            SourceType::Url => Self::Url,
        }
    }
}

/// Validation problems for one input record or row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Position of the record in the loaded source.
    pub record_index: usize,
    /// Every problem found, in field order.
    pub messages: Vec<String>,
}

/// Descriptive metadata attached to an ingestion result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionMetadata {
    /// Where the records came from.
    pub source: ResultOrigin,
    /// Configured source type.
    pub source_type: SourceType,
    /// Configured path or URL.
    pub location: String,
    /// Schema the records were validated against.
    pub schema: String,
    /// Load failure description, if the source could not be read.
    pub error: Option<String>,
}

/// Outcome summary of one ingestion run for one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Terminal status.
    pub status: IngestionStatus,
    /// Records and malformed rows seen.
    pub total_records: usize,
    /// Records that validated.
    pub successful_records: usize,
    /// Records or rows that did not validate.
    pub failed_records: usize,
    /// Per-record problems in source order.
    pub validation_errors: Vec<RecordError>,
    /// Wall-clock seconds from dispatch to completion.
    pub processing_time: f64,
    /// Content hash of the valid normalized set.
    pub data_hash: String,
    /// Descriptive metadata.
    pub metadata: IngestionMetadata,
}

impl IngestionResult {
    /// Builds a result whose status is derived from the counts.
    #[must_use]
    pub fn from_counts(
        successful_records: usize,
        validation_errors: Vec<RecordError>,
        processing_time: f64,
        data_hash: String,
        metadata: IngestionMetadata,
    ) -> Self {
        let failed_records = validation_errors.len();
        Self {
            status: IngestionStatus::from_counts(successful_records, failed_records),
            total_records: successful_records + failed_records,
            successful_records,
            failed_records,
            validation_errors,
            processing_time,
            data_hash,
            metadata,
        }
    }

    /// Builds the result of a source that could not be loaded at all.
    #[must_use]
    pub fn load_failure(
        error: impl Into<String>,
        processing_time: f64,
        mut metadata: IngestionMetadata,
    ) -> Self {
        metadata.error = Some(error.into());
        Self {
            status: IngestionStatus::Failed,
            total_records: 0,
            successful_records: 0,
            failed_records: 0,
            validation_errors: Vec::new(),
            processing_time,
            data_hash: String::new(),
            metadata,
        }
    }

    /// Returns a copy marked as served from the cache.
    #[must_use]
    pub fn served_from_cache(&self) -> Self {
        let mut result = self.clone();
        result.processing_time = 0.0;
        result.metadata.source = ResultOrigin::Cache;
        result
    }

    /// Returns true if at least one record is usable.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        !matches!(self.status, IngestionStatus::Failed)
    }
}

impl fmt::Display for IngestionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({:?} from {}): {}",
            self.metadata.location, self.metadata.source, self.metadata.schema, self.status
        )?;
        writeln!(
            f,
            "  records: {} total, {} ok, {} failed in {:.3}s",
            self.total_records, self.successful_records, self.failed_records, self.processing_time
        )?;
        if let Some(error) = &self.metadata.error {
            writeln!(f, "  error: {error}")?;
        }
        for record_error in &self.validation_errors {
            writeln!(
                f,
                "  #{}: {}",
                record_error.record_index,
                record_error.messages.join("; ")
            )?;
        }
        Ok(())
    }
}
