#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! JSON and JSON Lines source loaders.
//!
//! This crate provides two implementations of the [`SourceLoader`] trait from
//! `ingest-core`:
//!
//! - [`JsonLoader`] - Whole-document JSON (array of records or one object)
//! - [`JsonlLoader`] - One JSON record per line
//!
//! # Example
//!
//! ```no_run
//! use ingest_core::{DataSourceConfig, SourceLoader, SourceType};
//! use ingest_json::JsonLoader;
//! use std::path::Path;
//!
//! # async fn example() -> ingest_core::Result<()> {
//! let config = DataSourceConfig::new("transactions", SourceType::Json, "transactions.json", "transaction");
//! let batch = JsonLoader::new().load(&config, Path::new("data")).await?;
//! println!("Loaded {} rows", batch.len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use ingest_core::{DataSourceConfig, IngestError, Result, SourceBatch, SourceLoader, SourceType};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Decodes a whole JSON document into rows.
///
/// An array yields one row per element, an object yields a single row.
///
/// # Errors
/// Returns [`IngestError::Parse`] if the text is not JSON or its top-level
/// value is neither an array nor an object.
pub fn parse_document(text: &str) -> Result<SourceBatch> {
    let value: Value = serde_json::from_str(text).map_err(|e| IngestError::Parse(e.to_string()))?;
    match value {
        Value::Array(records) => Ok(SourceBatch::from_records(records)),
        Value::Object(_) => Ok(SourceBatch::from_records(vec![value])),
        other => Err(IngestError::Parse(format!(
            "expected a JSON array or object, found {}",
            kind_of(&other)
        ))),
    }
}

/// Decodes JSON Lines text, one row per non-empty line.
///
/// Lines that fail to decode become malformed rows.
#[must_use]
pub fn parse_lines(text: &str) -> SourceBatch {
    let mut batch = SourceBatch::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(record) => batch.push_record(record),
            Err(e) => {
                warn!(line = number + 1, error = %e, "Skipping malformed JSON line");
                batch.push_malformed(format!("line {}: {e}", number + 1));
            }
        }
    }
    batch
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn read_source(config: &DataSourceConfig, data_dir: &Path) -> Result<String> {
    let path = config.resolve_path(data_dir);
    debug!("Reading {}", path.display());
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))
}

/// Loader for whole-document JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl JsonLoader {
    /// Create a new JSON loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceLoader for JsonLoader {
    fn name(&self) -> &str {
        "JSON"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Json
    }

    async fn load(&self, config: &DataSourceConfig, data_dir: &Path) -> Result<SourceBatch> {
        let text = read_source(config, data_dir).await?;
        let batch = parse_document(&text)?;
        debug!(source = %config.name, rows = batch.len(), "Loaded JSON document");
        Ok(batch)
    }
}

/// Loader for JSON Lines files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlLoader;

impl JsonlLoader {
    /// Create a new JSON Lines loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceLoader for JsonlLoader {
    fn name(&self) -> &str {
        "JSON Lines"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Jsonl
    }

    async fn load(&self, config: &DataSourceConfig, data_dir: &Path) -> Result<SourceBatch> {
        let text = read_source(config, data_dir).await?;
        let batch = parse_lines(&text);
        debug!(
            source = %config.name,
            rows = batch.len(),
            malformed = batch.malformed_count(),
            "Loaded JSON Lines file"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::LoadedRow;
    use serde_json::json;

    fn config(source_type: SourceType, file: &str) -> DataSourceConfig {
        DataSourceConfig::new("test", source_type, file, "transaction")
    }

    #[test]
    fn test_parse_document_array_and_object() {
        let batch = parse_document(r#"[{"id": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(batch.len(), 2);

        let batch = parse_document(r#"{"id": "only"}"#).unwrap();
        assert_eq!(batch.records().next(), Some(&json!({"id": "only"})));
    }

    #[test]
    fn test_parse_document_rejects_scalars() {
        let err = parse_document("42").unwrap_err();
        assert!(matches!(err, IngestError::Parse(msg) if msg.contains("a number")));
        assert!(matches!(
            parse_document("{not json").unwrap_err(),
            IngestError::Parse(_)
        ));
    }

    #[test]
    fn test_parse_lines_keeps_bad_lines() {
        let batch = parse_lines("{\"id\": \"a\"}\n\n{oops\n{\"id\": \"b\"}\n");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.malformed_count(), 1);
        let rows: Vec<_> = batch.iter().collect();
        assert!(matches!(rows[1], LoadedRow::Malformed(msg) if msg.starts_with("line 3")));
    }

    #[tokio::test]
    async fn test_json_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("transactions.json"),
            r#"[{"id": "txn_001", "amount": -1500.0}]"#,
        )
        .unwrap();

        let batch = JsonLoader::new()
            .load(&config(SourceType::Json, "transactions.json"), dir.path())
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonLoader::new()
            .load(&config(SourceType::Json, "missing.json"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }

    #[tokio::test]
    async fn test_jsonl_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("events.jsonl"),
            "{\"id\": \"a\"}\nnot json\n{\"id\": \"b\"}\n",
        )
        .unwrap();

        let loader = JsonlLoader::new();
        assert_eq!(loader.source_type(), SourceType::Jsonl);
        let batch = loader
            .load(&config(SourceType::Jsonl, "events.jsonl"), dir.path())
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.records().count(), 2);
    }
}
