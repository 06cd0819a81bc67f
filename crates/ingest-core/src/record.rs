//! Raw and normalized record types.
//!
//! Loaders produce [`RawRecord`]s, loosely-typed JSON values whose shape varies
//! by source. The validator turns them into [`NormalizedRecord`]s whose declared
//! fields carry exactly the type their schema rule names.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::schema::{EntityKind, FieldType};

/// Untyped record as produced by a loader, expected to be a JSON object.
pub type RawRecord = Value;

/// Name of the timestamp attached to every normalized record.
pub const PROCESSED_AT_FIELD: &str = "processed_at";

/// Name of the row index attached by tabular loaders.
pub const SOURCE_ROW_FIELD: &str = "_source_row";

/// A field value after coercion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Finite floating point number.
    Number(f64),
    /// Whole number.
    Integer(i64),
    /// Boolean flag.
    Boolean(bool),
    /// UTC timestamp.
    Date(DateTime<Utc>),
    /// Lower-case enum member.
    Enum(String),
    /// Undeclared field passed through unchanged.
    Raw(Value),
}

impl FieldValue {
    /// Returns the schema type this value satisfies, or `None` for pass-through values.
    #[must_use]
    pub const fn field_type(&self) -> Option<FieldType> {
        match self {
            Self::Text(_) => Some(FieldType::String),
            Self::Number(_) => Some(FieldType::Number),
            Self::Integer(_) => Some(FieldType::Integer),
            Self::Boolean(_) => Some(FieldType::Boolean),
            Self::Date(_) => Some(FieldType::Date),
            Self::Enum(_) => Some(FieldType::Enum),
            Self::Raw(_) => None,
        }
    }

    /// Renders the value as plain JSON.
    ///
    /// Dates become RFC 3339 strings in UTC.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) | Self::Enum(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Integer(i) => Value::from(*i),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(dt) => Value::String(format_timestamp(dt)),
            Self::Raw(v) => v.clone(),
        }
    }
}

/// Formats a timestamp the way normalized records render dates.
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A record that passed validation against a named schema.
///
/// Every declared field that was present in the source is stored with the
/// type of its rule; undeclared fields are kept as [`FieldValue::Raw`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    schema: String,
    fields: BTreeMap<String, FieldValue>,
    processed_at: DateTime<Utc>,
}

impl NormalizedRecord {
    /// Creates a normalized record.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        fields: BTreeMap<String, FieldValue>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema: schema.into(),
            fields,
            processed_at,
        }
    }

    /// Name of the schema this record was validated against.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Built-in entity kind, if the schema is one of the built-ins.
    #[must_use]
    pub fn kind(&self) -> Option<EntityKind> {
        self.schema.parse().ok()
    }

    /// When the record was normalized.
    #[must_use]
    pub const fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }

    /// All fields, sorted by name.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Looks up a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    /// The `id` field, if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    /// Text or enum field as a string slice.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(s) | FieldValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Number or integer field as `f64`.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.fields.get(name)? {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer field.
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean field.
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.fields.get(name)? {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Date field.
    #[must_use]
    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name)? {
            FieldValue::Date(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Pass-through field.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        match self.fields.get(name)? {
            FieldValue::Raw(v) => Some(v),
            _ => None,
        }
    }

    /// Renders the record as a plain JSON object including `processed_at`.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = self.content_json();
        map.insert(
            PROCESSED_AT_FIELD.to_string(),
            Value::String(format_timestamp(&self.processed_at)),
        );
        map
    }

    /// Renders the record content without `processed_at`.
    ///
    /// Two ingestions of identical input produce identical content.
    #[must_use]
    pub fn content_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> NormalizedRecord {
        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), FieldValue::Text("inv_001".into()));
        fields.insert("type".to_string(), FieldValue::Enum("mutual_fund".into()));
        fields.insert("current_value".to_string(), FieldValue::Number(85000.0));
        fields.insert("emi_date".to_string(), FieldValue::Integer(5));
        fields.insert(
            "purchase_date".to_string(),
            FieldValue::Date(Utc.with_ymd_and_hms(2023, 12, 1, 10, 0, 0).unwrap()),
        );
        fields.insert("_source_row".to_string(), FieldValue::Raw(json!(0)));
        NormalizedRecord::new(
            "investment",
            fields,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_typed_accessors() {
        let record = sample();
        assert_eq!(record.id(), Some("inv_001"));
        assert_eq!(record.text("type"), Some("mutual_fund"));
        assert_eq!(record.number("current_value"), Some(85000.0));
        assert_eq!(record.number("emi_date"), Some(5.0));
        assert_eq!(record.integer("current_value"), None);
        assert_eq!(record.raw("_source_row"), Some(&json!(0)));
        assert_eq!(record.kind(), Some(EntityKind::Investment));
    }

    #[test]
    fn test_to_json_renders_dates() {
        let json = record_json();
        assert_eq!(json["purchase_date"], json!("2023-12-01T10:00:00Z"));
        assert_eq!(json["processed_at"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(json["current_value"], json!(85000.0));
    }

    fn record_json() -> Map<String, Value> {
        sample().to_json()
    }

    #[test]
    fn test_content_json_excludes_processed_at() {
        let content = sample().content_json();
        assert!(!content.contains_key(PROCESSED_AT_FIELD));
        assert_eq!(content.len(), 6);
    }

    #[test]
    fn test_serde_round_trip_is_lossless() {
        let record = sample();
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: NormalizedRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
