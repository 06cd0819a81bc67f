//! Columnar view of validated record sets.

use ingest_core::record::PROCESSED_AT_FIELD;
use ingest_core::{FieldValue, IngestError, NormalizedRecord, Result};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, TimeUnit};
use serde_json::Value;
use std::collections::BTreeSet;

/// Column kind inferred from the values present.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Datetime,
    Utf8,
}

impl ColumnKind {
    fn of(value: &FieldValue) -> Self {
        match value {
            FieldValue::Integer(_) => Self::Integer,
            FieldValue::Number(_) => Self::Float,
            FieldValue::Boolean(_) => Self::Boolean,
            FieldValue::Date(_) => Self::Datetime,
            FieldValue::Text(_) | FieldValue::Enum(_) | FieldValue::Raw(_) => Self::Utf8,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Integer, Self::Float) | (Self::Float, Self::Integer) => Self::Float,
            _ => Self::Utf8,
        }
    }
}

/// Builds a `DataFrame` with one row per record and one column per field.
///
/// Columns are sorted by name and `processed_at` comes last. Fields missing
/// from a record are null. Columns mixing types fall back to strings.
///
/// # Errors
/// Returns [`IngestError::Other`] if polars rejects the columns.
pub fn records_to_frame(records: &[NormalizedRecord]) -> Result<DataFrame> {
    if records.is_empty() {
        return Ok(DataFrame::empty());
    }

    let names: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.fields().keys().map(String::as_str))
        .collect();

    let mut columns = Vec::with_capacity(names.len() + 1);
    for name in names {
        let kind = records
            .iter()
            .filter_map(|r| r.get(name))
            .map(ColumnKind::of)
            .reduce(ColumnKind::merge)
            .unwrap_or(ColumnKind::Utf8);
        columns.push(build_column(name, kind, records)?);
    }

    let processed: Vec<Option<i64>> = records
        .iter()
        .map(|r| Some(r.processed_at().timestamp_millis()))
        .collect();
    columns.push(datetime_column(PROCESSED_AT_FIELD, processed)?);

    DataFrame::new(columns).map_err(|e| IngestError::Other(e.to_string()))
}

fn build_column(name: &str, kind: ColumnKind, records: &[NormalizedRecord]) -> Result<Column> {
    let values = records.iter().map(|r| r.get(name));
    let column = match kind {
        ColumnKind::Integer => {
            let data: Vec<Option<i64>> = values
                .map(|v| match v {
                    Some(FieldValue::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), data)
        }
        ColumnKind::Float => {
            let data: Vec<Option<f64>> = values
                .map(|v| match v {
                    Some(FieldValue::Number(n)) => Some(*n),
                    Some(FieldValue::Integer(i)) => Some(*i as f64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), data)
        }
        ColumnKind::Boolean => {
            let data: Vec<Option<bool>> = values
                .map(|v| match v {
                    Some(FieldValue::Boolean(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), data)
        }
        ColumnKind::Datetime => {
            let data: Vec<Option<i64>> = values
                .map(|v| match v {
                    Some(FieldValue::Date(dt)) => Some(dt.timestamp_millis()),
                    _ => None,
                })
                .collect();
            return datetime_column(name, data);
        }
        ColumnKind::Utf8 => {
            let data: Vec<Option<String>> = values.map(|v| v.and_then(text_cell)).collect();
            Column::new(name.into(), data)
        }
    };
    Ok(column)
}

fn datetime_column(name: &str, millis: Vec<Option<i64>>) -> Result<Column> {
    Column::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| IngestError::Other(format!("{name}: {e}")))
}

fn text_cell(value: &FieldValue) -> Option<String> {
    match value.to_json() {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn record(fields: Vec<(&str, FieldValue)>) -> NormalizedRecord {
        let fields: BTreeMap<_, _> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        NormalizedRecord::new(
            "investment",
            fields,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_records() {
        let df = records_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_columns_and_types() {
        let records = vec![
            record(vec![
                ("id", FieldValue::Text("inv_1".into())),
                ("current_value", FieldValue::Number(85000.0)),
                ("units", FieldValue::Integer(10)),
                ("tags", FieldValue::Raw(json!(["equity"]))),
            ]),
            record(vec![
                ("id", FieldValue::Text("inv_2".into())),
                ("current_value", FieldValue::Integer(1000)),
                (
                    "purchase_date",
                    FieldValue::Date(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()),
                ),
            ]),
        ];
        let df = records_to_frame(&records).unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<_> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            names,
            vec!["current_value", "id", "purchase_date", "tags", "units", "processed_at"]
        );

        let value = df.column("current_value").unwrap();
        assert_eq!(value.dtype(), &DataType::Float64);
        assert_eq!(value.f64().unwrap().get(1), Some(1000.0));

        let units = df.column("units").unwrap();
        assert_eq!(units.dtype(), &DataType::Int64);
        assert_eq!(units.null_count(), 1);

        assert_eq!(
            df.column("purchase_date").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, None)
        );
        assert_eq!(
            df.column("tags").unwrap().str().unwrap().get(0),
            Some("[\"equity\"]")
        );
    }
}
