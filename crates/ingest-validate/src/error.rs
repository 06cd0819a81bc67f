//! Per-field validation errors.

use ingest_core::FieldType;
use std::fmt;

/// One problem found while validating a record.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldError {
    /// The record is not a JSON object.
    NotAnObject,
    /// A required field is absent, null or blank.
    Missing {
        /// Field name.
        field: String,
    },
    /// The value cannot be coerced to the rule type.
    InvalidType {
        /// Field name.
        field: String,
        /// Type the rule expects.
        expected: FieldType,
    },
    /// An enum value outside the allowed set.
    NotAllowed {
        /// Field name.
        field: String,
        /// Allowed lower-case values.
        allowed: Vec<String>,
    },
    /// A number or date outside the rule bounds.
    OutOfRange {
        /// Field name.
        field: String,
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// A string longer than the rule allows.
    TooLong {
        /// Field name.
        field: String,
        /// Maximum character count.
        max_length: usize,
    },
}

impl FieldError {
    /// Field the error refers to, or `None` for record-level errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject => None,
            Self::Missing { field }
            | Self::InvalidType { field, .. }
            | Self::NotAllowed { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::TooLong { field, .. } => Some(field),
        }
    }
}

fn bound(value: Option<f64>, unbounded: &str) -> String {
    value.map_or_else(|| unbounded.to_string(), |v| v.to_string())
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "record must be a JSON object"),
            Self::Missing { field } => write!(f, "missing required field {field}"),
            Self::InvalidType { field, expected } => {
                write!(f, "invalid type for field {field}, expected {expected}")
            }
            Self::NotAllowed { field, allowed } => write!(
                f,
                "invalid type for field {field}, expected one of [{}]",
                allowed.join(", ")
            ),
            Self::OutOfRange { field, min, max } => write!(
                f,
                "field {field} out of range [{}, {}]",
                bound(*min, "-inf"),
                bound(*max, "inf")
            ),
            Self::TooLong { field, max_length } => {
                write!(f, "field {field} exceeds maximum length {max_length}")
            }
        }
    }
}

impl std::error::Error for FieldError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let missing = FieldError::Missing {
            field: "description".into(),
        };
        assert_eq!(missing.to_string(), "missing required field description");

        let invalid = FieldError::InvalidType {
            field: "amount".into(),
            expected: FieldType::Number,
        };
        assert_eq!(
            invalid.to_string(),
            "invalid type for field amount, expected number"
        );

        let range = FieldError::OutOfRange {
            field: "balance".into(),
            min: Some(0.0),
            max: None,
        };
        assert_eq!(range.to_string(), "field balance out of range [0, inf]");
    }

    #[test]
    fn test_field_accessor() {
        assert_eq!(FieldError::NotAnObject.field(), None);
        let err = FieldError::TooLong {
            field: "name".into(),
            max_length: 200,
        };
        assert_eq!(err.field(), Some("name"));
    }
}
