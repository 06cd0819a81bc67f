#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ingest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Personal-finance record ingestion, validation and normalization.
//!
//! This crate re-exports the core types, the validator, cache backends and
//! the enabled loaders, and provides the [`IngestionOrchestrator`] that ties
//! them together.
//!
//! # Example
//!
//! ```rust,ignore
//! use ingest::{IngestionOrchestrator, IngestSettings, init_logging};
//!
//! #[tokio::main]
//! async fn main() -> ingest::Result<()> {
//!     let settings = IngestSettings::from_env()?;
//!     init_logging(&settings.log)?;
//!
//!     let orchestrator = IngestionOrchestrator::from_settings(&settings)?;
//!     orchestrator.register_default_sources().await;
//!
//!     for (name, result) in orchestrator.ingest_all_data(false).await {
//!         println!("{name}: {result}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use ingest_core::*;

// Validation
pub use ingest_validate::{
    BatchOutcome, FieldError, InvalidItem, ValidItem, ValidationOutcome, Validator,
};

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use ingest_cache::SqliteCache;
pub use ingest_cache::{InMemoryCache, NoopCache};

// Loaders
#[cfg(feature = "tabular")]
pub use ingest_csv::CsvLoader;
#[cfg(feature = "http")]
pub use ingest_http::UrlLoader;
#[cfg(feature = "json")]
pub use ingest_json::{JsonLoader, JsonlLoader};
#[cfg(feature = "mock")]
pub use ingest_mock::MockLoader;

/// Writing cached record sets to files.
pub mod export;
/// Columnar view of record sets.
pub mod frame;
/// Tracing subscriber setup.
pub mod logging;
/// Runtime settings and source manifests.
pub mod settings;

mod orchestrator;

pub use export::ExportFormat;
pub use frame::records_to_frame;
pub use logging::{LogFormat, LogLevel, LogSettings, init_logging};
pub use orchestrator::{IngestionOrchestrator, IngestionRun, SourceStatus};
pub use settings::{IngestSettings, load_source_manifest};
