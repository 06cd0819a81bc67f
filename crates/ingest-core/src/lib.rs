#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for personal-finance record ingestion.
//!
//! This crate provides the foundational abstractions shared by loaders, the
//! validator, caches and the orchestrator:
//!
//! - [`SchemaRegistry`](schema::SchemaRegistry) - Field rules per entity type
//! - [`NormalizedRecord`](record::NormalizedRecord) - Schema-typed validated record
//! - [`IngestionResult`](result::IngestionResult) - Outcome of one ingestion run
//! - [`SourceLoader`](source::SourceLoader) - Format-specific raw record reader
//! - [`RecordCache`](cache::RecordCache) - Caching abstraction for validated sets
//! - [`content_hash`](hash::content_hash) - Canonical hash for change detection

/// Cache trait and entry type for validated record sets.
pub mod cache;
/// Error types for ingestion operations.
pub mod error;
/// Canonical content hashing.
pub mod hash;
/// Raw and normalized record types.
pub mod record;
/// Ingestion status and result types.
pub mod result;
/// Schema registry and field rules.
pub mod schema;
/// Data source configuration and the loader trait.
pub mod source;

// Re-export commonly used items at crate root
pub use cache::{CacheEntry, RecordCache};
pub use error::{IngestError, Result};
pub use hash::content_hash;
pub use record::{FieldValue, NormalizedRecord, RawRecord};
pub use result::{IngestionMetadata, IngestionResult, IngestionStatus, RecordError, ResultOrigin};
pub use schema::{EntityKind, FieldRule, FieldType, Schema, SchemaRegistry};
pub use source::{DataSourceConfig, LoadedRow, SourceBatch, SourceLoader, SourceType};
