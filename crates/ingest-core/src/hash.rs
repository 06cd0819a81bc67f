//! Canonical content hashing for change detection.
//!
//! The hash is a pure function of record content: object keys are sorted at
//! every depth and `processed_at` is excluded, so re-ingesting an unchanged
//! source yields the same hash regardless of field order in the file.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::record::NormalizedRecord;

/// Computes the SHA-256 hex digest of a normalized record set.
///
/// Record order is significant; key order is not.
#[must_use]
pub fn content_hash(records: &[NormalizedRecord]) -> String {
    let content = Value::Array(
        records
            .iter()
            .map(|r| Value::Object(r.content_json()))
            .collect(),
    );
    let mut buf = Vec::new();
    write_canonical(&content, &mut buf);

    let mut hasher = Sha256::new();
    hasher.update(&buf);
    hex::encode(hasher.finalize())
}

/// Writes compact JSON with object keys sorted recursively.
fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(key.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(item, out);
            }
            out.push(b'}');
        }
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}
