//! Type coercion from loosely-typed JSON values.
//!
//! Every function returns `None` when the value cannot be represented as the
//! requested type. Range and length checks are applied by the validator after
//! coercion succeeds.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ingest_core::{FieldRule, FieldType, FieldValue};
use serde_json::Value;

/// Currency markers stripped from numeric strings before parsing.
const CURRENCY_MARKERS: [&str; 5] = ["\u{20b9}", "Rs.", "Rs", "INR", "$"];

/// Naive date-time layouts tried after RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Returns true for values treated as absent: null and blank strings.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Coerces a value to the type named by `rule`.
///
/// Enum membership is not checked here.
#[must_use]
pub fn coerce(value: &Value, rule: &FieldRule) -> Option<FieldValue> {
    match rule.field_type {
        FieldType::String => to_text(value).map(FieldValue::Text),
        FieldType::Number => to_number(value).map(FieldValue::Number),
        FieldType::Integer => to_integer(value).map(FieldValue::Integer),
        FieldType::Boolean => to_boolean(value).map(FieldValue::Boolean),
        FieldType::Date => to_date(value).map(FieldValue::Date),
        FieldType::Enum => to_text(value).map(|s| FieldValue::Enum(s.to_lowercase())),
    }
}

/// Scalar to trimmed text.
#[must_use]
pub fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Number or numeric string to a finite `f64`.
#[must_use]
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parses a numeric string, stripping thousands separators and currency markers.
#[must_use]
pub fn parse_number(s: &str) -> Option<f64> {
    let mut cleaned = s.trim().to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integral number or string to `i64`.
#[must_use]
pub fn to_integer(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    let n = to_number(value)?;
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Boolean, `0`/`1`, or a yes/no style string to `bool`.
#[must_use]
pub fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Date string or Unix seconds to a UTC timestamp.
#[must_use]
pub fn to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        _ => None,
    }
}

/// Parses a date string, trying RFC 3339 first and then common layouts.
///
/// Values without an offset are taken as UTC.
#[must_use]
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Value used for range checks: the number itself, or Unix seconds for dates.
#[must_use]
pub fn range_value(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Integer(i) => Some(*i as f64),
        FieldValue::Date(dt) => Some(dt.timestamp() as f64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_number_strips_separators() {
        assert_eq!(parse_number("85000.00"), Some(85000.0));
        assert_eq!(parse_number("1,25,000.50"), Some(125000.5));
        assert_eq!(parse_number("\u{20b9} 2,500"), Some(2500.0));
        assert_eq!(parse_number("Rs. 1,000"), Some(1000.0));
        assert_eq!(parse_number("-1500"), Some(-1500.0));
        assert_eq!(parse_number("invalid_amount"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(&json!(12)), Some(12));
        assert_eq!(to_integer(&json!(12.0)), Some(12));
        assert_eq!(to_integer(&json!("36")), Some(36));
        assert_eq!(to_integer(&json!(12.5)), None);
        assert_eq!(to_integer(&json!(true)), None);
    }

    #[test]
    fn test_to_boolean() {
        assert_eq!(to_boolean(&json!(true)), Some(true));
        assert_eq!(to_boolean(&json!("Yes")), Some(true));
        assert_eq!(to_boolean(&json!("false")), Some(false));
        assert_eq!(to_boolean(&json!(0)), Some(false));
        assert_eq!(to_boolean(&json!(2)), None);
        assert_eq!(to_boolean(&json!("maybe")), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 12, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_date("2023-12-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_date("2023-12-01T15:30:00+05:30"), Some(expected));
        assert_eq!(parse_date("2023-12-01T10:00:00"), Some(expected));
        assert_eq!(parse_date("2023-12-01 10:00:00"), Some(expected));
        assert_eq!(parse_date("2023-12-01T10:00:00.000"), Some(expected));

        let midnight = Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2020-01-15"), Some(midnight));
        assert_eq!(parse_date("15/01/2020"), Some(midnight));
        assert_eq!(parse_date("15 Jan 2020"), Some(midnight));
        assert_eq!(parse_date("Jan 15, 2020"), Some(midnight));

        assert_eq!(parse_date("invalid_date"), None);
    }

    #[test]
    fn test_to_date_from_unix_seconds() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_date(&json!(1_704_067_200)), Some(expected));
        assert_eq!(to_date(&json!([2024, 1, 1])), None);
    }

    #[test]
    fn test_coerce_enum_lowercases() {
        let rule = FieldRule::one_of(&["savings"]);
        assert_eq!(
            coerce(&json!(" Savings "), &rule),
            Some(FieldValue::Enum("savings".into()))
        );
    }

    #[test]
    fn test_blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("   ")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
    }
}
