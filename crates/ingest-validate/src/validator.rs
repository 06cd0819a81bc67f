//! Record and batch validation against the schema registry.

use chrono::{DateTime, Utc};
use ingest_core::record::PROCESSED_AT_FIELD;
use ingest_core::{
    FieldType, FieldValue, NormalizedRecord, RawRecord, Result, Schema, SchemaRegistry,
};
use serde_json::Map;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::coerce::{coerce, is_blank, range_value};
use crate::error::FieldError;
use crate::normalize::normalize;

/// Result of validating one record.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationOutcome {
    /// The record satisfied every rule.
    Valid(NormalizedRecord),
    /// The record violated at least one rule.
    Invalid {
        /// The record as submitted.
        record: RawRecord,
        /// Every violation found.
        errors: Vec<FieldError>,
    },
}

impl ValidationOutcome {
    /// Returns true for [`ValidationOutcome::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Errors for an invalid record, empty otherwise.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid(_) => &[],
            Self::Invalid { errors, .. } => errors,
        }
    }

    /// Human-readable error messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors().iter().map(ToString::to_string).collect()
    }

    /// The normalized record, if valid.
    #[must_use]
    pub fn into_record(self) -> Option<NormalizedRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Invalid { .. } => None,
        }
    }
}

/// A valid record with its position in the input batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidItem {
    /// Position in the input batch.
    pub index: usize,
    /// Normalized record.
    pub record: NormalizedRecord,
}

/// An invalid record with its position in the input batch.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidItem {
    /// Position in the input batch.
    pub index: usize,
    /// The record as submitted.
    pub record: RawRecord,
    /// Every violation found.
    pub errors: Vec<FieldError>,
}

impl InvalidItem {
    /// Human-readable error messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Outcome of validating a batch, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    valid: Vec<ValidItem>,
    invalid: Vec<InvalidItem>,
}

impl BatchOutcome {
    /// Number of records submitted.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    /// Number of valid records.
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    /// Number of invalid records.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    /// Valid records in input order.
    #[must_use]
    pub fn valid_items(&self) -> &[ValidItem] {
        &self.valid
    }

    /// Invalid records in input order.
    #[must_use]
    pub fn invalid_items(&self) -> &[InvalidItem] {
        &self.invalid
    }

    /// Consumes the outcome, returning the normalized records.
    #[must_use]
    pub fn into_valid_records(self) -> Vec<NormalizedRecord> {
        self.valid.into_iter().map(|item| item.record).collect()
    }

    /// Splits the outcome into its valid and invalid items.
    #[must_use]
    pub fn into_parts(self) -> (Vec<ValidItem>, Vec<InvalidItem>) {
        (self.valid, self.invalid)
    }

    /// Number of errors per field across the batch.
    ///
    /// Record-level errors are counted under `"record"`.
    #[must_use]
    pub fn error_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for error in self.invalid.iter().flat_map(|item| &item.errors) {
            let key = error.field().unwrap_or("record").to_string();
            *summary.entry(key).or_insert(0) += 1;
        }
        summary
    }
}

/// Validates raw records against named schemas and normalizes the valid ones.
///
/// The registry is shared read-only, so a validator is cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    registry: Arc<SchemaRegistry>,
}

impl Validator {
    /// Creates a validator over the built-in schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Arc::new(SchemaRegistry::new()))
    }

    /// Creates a validator over a custom registry.
    #[must_use]
    pub const fn with_registry(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// The schema registry in use.
    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Validates one record.
    ///
    /// # Errors
    /// Returns [`ingest_core::IngestError::SchemaNotFound`] for unknown schemas.
    pub fn validate_record(&self, record: &RawRecord, schema_name: &str) -> Result<ValidationOutcome> {
        let schema = self.registry.get_schema(schema_name)?;
        Ok(validate_against(record, schema, Utc::now()))
    }

    /// Validates a batch, preserving input order.
    ///
    /// All valid records in the batch share one `processed_at`.
    ///
    /// # Errors
    /// Returns [`ingest_core::IngestError::SchemaNotFound`] for unknown schemas.
    pub fn validate_bulk(&self, records: &[RawRecord], schema_name: &str) -> Result<BatchOutcome> {
        let schema = self.registry.get_schema(schema_name)?;
        let now = Utc::now();
        let mut outcome = BatchOutcome::default();

        for (index, record) in records.iter().enumerate() {
            match validate_against(record, schema, now) {
                ValidationOutcome::Valid(record) => outcome.valid.push(ValidItem { index, record }),
                ValidationOutcome::Invalid { record, errors } => {
                    outcome.invalid.push(InvalidItem {
                        index,
                        record,
                        errors,
                    });
                }
            }
        }

        debug!(
            schema = schema_name,
            total = outcome.total_count(),
            invalid = outcome.invalid_count(),
            "Validated batch"
        );
        Ok(outcome)
    }
}

/// Validates one record against a resolved schema.
///
/// Every rule is checked; errors accumulate rather than short-circuit.
#[must_use]
pub fn validate_against(record: &RawRecord, schema: &Schema, now: DateTime<Utc>) -> ValidationOutcome {
    let Some(object) = record.as_object() else {
        return ValidationOutcome::Invalid {
            record: record.clone(),
            errors: vec![FieldError::NotAnObject],
        };
    };

    let mut fields = BTreeMap::new();
    let mut errors = Vec::new();
    let mut declared = HashSet::new();

    for (name, rule) in schema.fields() {
        declared.insert(name);
        let value = match object.get(name) {
            Some(value) if !is_blank(value) => value,
            _ => {
                if rule.required {
                    errors.push(FieldError::Missing {
                        field: name.to_string(),
                    });
                }
                continue;
            }
        };

        let Some(coerced) = coerce(value, rule) else {
            errors.push(FieldError::InvalidType {
                field: name.to_string(),
                expected: rule.field_type,
            });
            continue;
        };

        if let FieldValue::Enum(member) = &coerced {
            if !rule.allows(member) {
                errors.push(FieldError::NotAllowed {
                    field: name.to_string(),
                    allowed: rule.enum_values.clone().unwrap_or_default(),
                });
                continue;
            }
        }

        if let Some(n) = range_value(&coerced) {
            let below = rule.min.is_some_and(|min| n < min);
            let above = rule.max.is_some_and(|max| n > max);
            if below || above {
                errors.push(FieldError::OutOfRange {
                    field: name.to_string(),
                    min: rule.min,
                    max: rule.max,
                });
                continue;
            }
        }

        if rule.field_type == FieldType::String {
            if let (FieldValue::Text(text), Some(max_length)) = (&coerced, rule.max_length) {
                if text.chars().count() > max_length {
                    errors.push(FieldError::TooLong {
                        field: name.to_string(),
                        max_length,
                    });
                    continue;
                }
            }
        }

        fields.insert(name.to_string(), coerced);
    }

    if !errors.is_empty() {
        return ValidationOutcome::Invalid {
            record: record.clone(),
            errors,
        };
    }

    for (name, value) in passthrough(object, &declared) {
        fields.insert(name, FieldValue::Raw(value));
    }

    let mut normalized = NormalizedRecord::new(schema.name(), fields, now);
    if let Some(kind) = schema.kind() {
        normalize(&mut normalized, kind, now);
    }
    ValidationOutcome::Valid(normalized)
}

/// Undeclared fields, minus any incoming `processed_at`.
fn passthrough(
    object: &Map<String, serde_json::Value>,
    declared: &HashSet<&str>,
) -> Vec<(String, serde_json::Value)> {
    object
        .iter()
        .filter(|(name, _)| !declared.contains(name.as_str()) && *name != PROCESSED_AT_FIELD)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
