#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Schema validation and normalization of raw finance records.
//!
//! # Example
//!
//! ```
//! use ingest_validate::Validator;
//! use serde_json::json;
//!
//! let validator = Validator::new();
//! let outcome = validator
//!     .validate_record(
//!         &json!({"id": "acc_1", "name": "Savings", "type": "SAVINGS", "balance": "1,250.50"}),
//!         "account",
//!     )
//!     .unwrap();
//!
//! let record = outcome.into_record().unwrap();
//! assert_eq!(record.number("balance"), Some(1250.5));
//! assert_eq!(record.text("type"), Some("savings"));
//! ```

/// Type coercion from loosely-typed JSON values.
pub mod coerce;
/// Per-field validation errors.
pub mod error;
/// Entity-specific normalization rules.
pub mod normalize;
/// Record and batch validation.
pub mod validator;

pub use error::FieldError;
pub use validator::{BatchOutcome, InvalidItem, ValidItem, ValidationOutcome, Validator};
