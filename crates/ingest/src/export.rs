//! Writing cached record sets back to disk.

use ingest_core::{IngestError, NormalizedRecord, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// File format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array.
    Json,
    /// CSV with a header of every field name, sorted.
    Csv,
    /// One JSON object per line.
    Jsonl,
}

impl ExportFormat {
    /// Conventional file extension.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(IngestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Renders records in the given format.
///
/// # Errors
/// Returns [`IngestError::Parse`] if serialization fails.
pub fn render(records: &[NormalizedRecord], format: ExportFormat) -> Result<Vec<u8>> {
    let rows: Vec<Map<String, Value>> = records.iter().map(NormalizedRecord::to_json).collect();
    match format {
        ExportFormat::Json => {
            serde_json::to_vec_pretty(&rows).map_err(|e| IngestError::Parse(e.to_string()))
        }
        ExportFormat::Jsonl => {
            let mut out = Vec::new();
            for row in &rows {
                serde_json::to_writer(&mut out, row).map_err(|e| IngestError::Parse(e.to_string()))?;
                out.push(b'\n');
            }
            Ok(out)
        }
        ExportFormat::Csv => render_csv(&rows),
    }
}

fn render_csv(rows: &[Map<String, Value>]) -> Result<Vec<u8>> {
    let header: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&header)
        .map_err(|e| IngestError::Parse(e.to_string()))?;
    for row in rows {
        let cells = header.iter().map(|name| cell(row.get(*name)));
        writer
            .write_record(cells)
            .map_err(|e| IngestError::Parse(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| IngestError::Parse(e.to_string()))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes records to `path`, replacing any existing file.
///
/// # Errors
/// Returns [`IngestError::Io`] if the file cannot be written.
pub async fn write_records(
    records: &[NormalizedRecord],
    path: &Path,
    format: ExportFormat,
) -> Result<()> {
    let bytes = render(records, format)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ingest_core::FieldValue;
    use std::collections::BTreeMap;

    fn records() -> Vec<NormalizedRecord> {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut first = BTreeMap::new();
        first.insert("id".to_string(), FieldValue::Text("acc_1".into()));
        first.insert("balance".to_string(), FieldValue::Number(1250.5));
        let mut second = BTreeMap::new();
        second.insert("id".to_string(), FieldValue::Text("acc_2".into()));
        second.insert("bank".to_string(), FieldValue::Text("Bank, Ltd".into()));
        vec![
            NormalizedRecord::new("account", first, at),
            NormalizedRecord::new("account", second, at),
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("ndjson".parse::<ExportFormat>().unwrap(), ExportFormat::Jsonl);
        assert_eq!(
            "xml".parse::<ExportFormat>().unwrap_err(),
            IngestError::UnsupportedFormat("xml".into())
        );
    }

    #[test]
    fn test_csv_header_is_sorted_union() {
        let text = String::from_utf8(render(&records(), ExportFormat::Csv).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("balance,bank,id,processed_at"));
        assert_eq!(lines.next(), Some("1250.5,,acc_1,2024-01-01T00:00:00Z"));
        assert_eq!(
            lines.next(),
            Some(",\"Bank, Ltd\",acc_2,2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let text = String::from_utf8(render(&records(), ExportFormat::Jsonl).unwrap()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "acc_1");
    }

    #[tokio::test]
    async fn test_write_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        write_records(&records(), &path, ExportFormat::Json)
            .await
            .unwrap();

        let parsed: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let expected: Vec<Value> = records()
            .iter()
            .map(|r| Value::Object(r.to_json()))
            .collect();
        assert_eq!(parsed, expected);
    }
}
