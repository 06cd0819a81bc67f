#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! CSV source loader.
//!
//! [`CsvLoader`] turns each data row into a JSON object keyed by the header
//! names. Rows whose field count differs from the header are reported as
//! malformed rows; the rest of the file still loads.

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, Trim};
use ingest_core::record::SOURCE_ROW_FIELD;
use ingest_core::{DataSourceConfig, IngestError, Result, SourceBatch, SourceLoader, SourceType};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Decodes CSV text with a header row.
///
/// # Errors
/// Returns [`IngestError::Parse`] if the header row cannot be read.
pub fn parse_csv(text: &str) -> Result<SourceBatch> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Parse(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let mut batch = SourceBatch::new();
    for (row, result) in reader.records().enumerate() {
        match result {
            Ok(record) => batch.push_record(row_to_record(&headers, &record, row)),
            Err(e) => {
                warn!(row, error = %e, "Skipping malformed CSV row");
                batch.push_malformed(format!("row {row}: {e}"));
            }
        }
    }
    Ok(batch)
}

fn row_to_record(headers: &StringRecord, record: &StringRecord, row: usize) -> Value {
    let mut object: Map<String, Value> = headers
        .iter()
        .zip(record.iter())
        .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
        .collect();
    object.insert(SOURCE_ROW_FIELD.to_string(), Value::from(row));
    Value::Object(object)
}

/// Loader for CSV files with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLoader;

impl CsvLoader {
    /// Create a new CSV loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceLoader for CsvLoader {
    fn name(&self) -> &str {
        "CSV"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Csv
    }

    async fn load(&self, config: &DataSourceConfig, data_dir: &Path) -> Result<SourceBatch> {
        let path = config.resolve_path(data_dir);
        debug!("Reading {}", path.display());
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))?;

        let batch = parse_csv(&text)?;
        debug!(
            source = %config.name,
            rows = batch.len(),
            malformed = batch.malformed_count(),
            "Loaded CSV file"
        );
        Ok(batch)
    }
}
