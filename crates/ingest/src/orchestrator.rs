//! Ingestion orchestrator coordinating loaders, validation and caching.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use ingest_cache::InMemoryCache;
use ingest_core::{
    CacheEntry, DataSourceConfig, EntityKind, IngestError, IngestionMetadata, IngestionResult,
    IngestionStatus, LoadedRow, NormalizedRecord, RecordCache, RecordError, Result, ResultOrigin,
    SourceLoader, SourceType, content_hash,
};
use ingest_validate::Validator;

use crate::export::{ExportFormat, write_records};
use crate::frame::records_to_frame;
use crate::settings::IngestSettings;

/// Summary of one bulk ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRun {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Number of sources attempted.
    pub sources_processed: usize,
    /// Terminal status per source.
    pub statuses: BTreeMap<String, IngestionStatus>,
}

/// Registration and cache state of one source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Whether bulk ingestion includes the source.
    pub enabled: bool,
    /// Configured input format.
    pub source_type: SourceType,
    /// Schema the source validates against.
    pub schema: String,
    /// Number of cached valid records.
    pub cached_records: usize,
    /// Hash of the cached set, if any.
    pub data_hash: Option<String>,
    /// When the source was last loaded.
    pub last_ingested: Option<DateTime<Utc>>,
    /// Status of the last load.
    pub last_status: Option<IngestionStatus>,
}

#[derive(Clone, Copy, Debug)]
struct LastRun {
    at: DateTime<Utc>,
    status: IngestionStatus,
}

/// Loads, validates and caches records from named data sources.
///
/// Each source is keyed by name. A successful or partial load replaces the
/// cached set for that name; a failed load leaves the previous set in place.
///
/// # Example
///
/// ```rust,ignore
/// use ingest::{DataSourceConfig, IngestionOrchestrator, SourceType};
///
/// let orchestrator = IngestionOrchestrator::new("data");
/// orchestrator
///     .register_data_source(DataSourceConfig::new(
///         "accounts",
///         SourceType::Json,
///         "accounts.json",
///         "account",
///     ))
///     .await;
///
/// let result = orchestrator.ingest_data_source("accounts", false, None).await?;
/// println!("{result}");
/// ```
pub struct IngestionOrchestrator {
    data_dir: PathBuf,
    max_records: Option<usize>,
    validator: Validator,
    loaders: HashMap<SourceType, Arc<dyn SourceLoader>>,
    cache: Arc<dyn RecordCache>,
    sources: RwLock<BTreeMap<String, DataSourceConfig>>,
    last_runs: RwLock<HashMap<String, LastRun>>,
    history: RwLock<Vec<IngestionRun>>,
}

impl std::fmt::Debug for IngestionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut loaders: Vec<_> = self.loaders.values().map(|l| l.name()).collect();
        loaders.sort_unstable();
        f.debug_struct("IngestionOrchestrator")
            .field("data_dir", &self.data_dir)
            .field("max_records", &self.max_records)
            .field("loaders", &loaders)
            .field("cache", &"configured")
            .finish_non_exhaustive()
    }
}

impl IngestionOrchestrator {
    /// Create an orchestrator with the enabled loaders and an in-memory cache.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let mut orchestrator = Self {
            data_dir: data_dir.into(),
            max_records: None,
            validator: Validator::new(),
            loaders: HashMap::new(),
            cache: Arc::new(InMemoryCache::new()),
            sources: RwLock::new(BTreeMap::new()),
            last_runs: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
        };

        #[cfg(feature = "json")]
        {
            orchestrator.register_loader(Arc::new(ingest_json::JsonLoader::new()));
            orchestrator.register_loader(Arc::new(ingest_json::JsonlLoader::new()));
        }
        #[cfg(feature = "tabular")]
        orchestrator.register_loader(Arc::new(ingest_csv::CsvLoader::new()));
        #[cfg(feature = "mock")]
        orchestrator.register_loader(Arc::new(ingest_mock::MockLoader::new()));
        #[cfg(feature = "http")]
        match ingest_http::UrlLoader::new() {
            Ok(loader) => orchestrator.register_loader(Arc::new(loader)),
            Err(e) => warn!(error = %e, "URL loader unavailable"),
        }

        orchestrator
    }

    /// Create an orchestrator from runtime settings.
    ///
    /// A configured `cache_path` selects the SQLite cache.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be opened or the HTTP client
    /// cannot be built.
    pub fn from_settings(settings: &IngestSettings) -> Result<Self> {
        #[allow(unused_mut)]
        let mut orchestrator =
            Self::new(settings.data_dir.clone()).with_max_records(settings.max_records);

        if let Some(path) = &settings.cache_path {
            #[cfg(feature = "cache-sqlite")]
            {
                let cache = ingest_cache::SqliteCache::new(path)?;
                orchestrator = orchestrator.with_cache(Arc::new(cache));
            }
            #[cfg(not(feature = "cache-sqlite"))]
            warn!(
                path = %path.display(),
                "SQLite cache support not compiled in, using memory cache"
            );
        }

        #[cfg(feature = "mock")]
        {
            let mock = ingest_mock::MockLoader::new().with_count(settings.mock_records);
            orchestrator = orchestrator.with_loader(Arc::new(mock));
        }
        #[cfg(feature = "http")]
        {
            let url = ingest_http::UrlLoader::with_timeout(settings.http_timeout)?;
            orchestrator = orchestrator.with_loader(Arc::new(url));
        }

        Ok(orchestrator)
    }

    /// Replace the cache backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn RecordCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the default row cap per load; `None` loads every row.
    #[must_use]
    pub const fn with_max_records(mut self, max_records: Option<usize>) -> Self {
        self.max_records = max_records;
        self
    }

    /// Replace the validator, e.g. to use a custom schema registry.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Register a loader, replacing any loader for the same source type.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.register_loader(loader);
        self
    }

    /// Remove the loader for a source type.
    #[must_use]
    pub fn without_loader(mut self, source_type: SourceType) -> Self {
        self.loaders.remove(&source_type);
        self
    }

    /// Register a loader, replacing any loader for the same source type.
    pub fn register_loader(&mut self, loader: Arc<dyn SourceLoader>) {
        debug!(loader = loader.name(), source_type = %loader.source_type(), "Registering loader");
        self.loaders.insert(loader.source_type(), loader);
    }

    /// Directory relative file paths are resolved against.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Register a data source, replacing any source with the same name.
    ///
    /// Replacing a source with a different location, type or schema drops
    /// its cached set.
    pub async fn register_data_source(&self, config: DataSourceConfig) {
        info!(
            source = %config.name,
            source_type = %config.source_type,
            location = %config.path_or_url,
            "Registered data source"
        );
        let previous = self
            .sources
            .write()
            .await
            .insert(config.name.clone(), config.clone());

        let changed = previous.is_some_and(|old| {
            old.path_or_url != config.path_or_url
                || old.source_type != config.source_type
                || old.schema_name != config.schema_name
        });
        if changed {
            match self.cache.remove(&config.name).await {
                Ok(removed) => debug!(source = %config.name, removed, "Source replaced"),
                Err(e) => warn!(source = %config.name, error = %e, "Failed to drop cached set"),
            }
        }
    }

    /// Register one JSON file source per built-in entity type.
    ///
    /// Sources are named after the file stem, e.g. `transactions` reads
    /// `transactions.json` with the `transaction` schema.
    pub async fn register_default_sources(&self) {
        for kind in EntityKind::ALL {
            let name = match kind {
                EntityKind::Liability => "liabilities".to_string(),
                other => format!("{}s", other.as_str()),
            };
            let path = format!("{name}.json");
            self.register_data_source(DataSourceConfig::new(
                name,
                SourceType::Json,
                path,
                kind.as_str(),
            ))
            .await;
        }
    }

    /// Registered sources, sorted by name.
    pub async fn data_sources(&self) -> Vec<DataSourceConfig> {
        self.sources.read().await.values().cloned().collect()
    }

    /// Ingest one source.
    ///
    /// Unless `force_refresh` is set, a fresh cache entry is returned as is,
    /// marked with [`ResultOrigin::Cache`]. Otherwise the source is loaded,
    /// capped at `max_records` (or the orchestrator default, if any),
    /// validated and, if any record is usable, cached.
    ///
    /// # Errors
    /// Returns configuration errors for unknown sources, schemas or source
    /// types without a loader. Load failures are reported as a
    /// [`IngestionStatus::Failed`] result instead.
    #[instrument(skip(self))]
    pub async fn ingest_data_source(
        &self,
        name: &str,
        force_refresh: bool,
        max_records: Option<usize>,
    ) -> Result<IngestionResult> {
        let config = self
            .sources
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| IngestError::SourceNotFound(name.to_string()))?;

        self.validator.registry().get_schema(&config.schema_name)?;
        let loader = self
            .loaders
            .get(&config.source_type)
            .ok_or_else(|| IngestError::LoaderNotConfigured(config.source_type.to_string()))?;

        if !force_refresh {
            if let Some(entry) = self.fresh_entry(&config).await {
                debug!(source = name, "Serving cached result");
                return Ok(entry.result.served_from_cache());
            }
        }

        let started = Instant::now();
        let metadata = metadata_for(&config);

        let mut batch = match loader.load(&config, &self.data_dir).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(source = name, error = %e, "Failed to load data source");
                let result = IngestionResult::load_failure(
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                    metadata,
                );
                self.record_run(name, result.status).await;
                return Ok(result);
            }
        };
        if let Some(max) = max_records.or(self.max_records) {
            if batch.len() > max {
                debug!(source = name, rows = batch.len(), max, "Capping loaded rows");
                batch.truncate(max);
            }
        }

        let mut errors = Vec::new();
        let mut raws = Vec::with_capacity(batch.len());
        let mut positions = Vec::with_capacity(batch.len());
        for (position, row) in batch.into_iter().enumerate() {
            match row {
                LoadedRow::Record(record) => {
                    raws.push(record);
                    positions.push(position);
                }
                LoadedRow::Malformed(message) => errors.push(RecordError {
                    record_index: position,
                    messages: vec![message],
                }),
            }
        }

        let (valid, invalid) = self
            .validator
            .validate_bulk(&raws, &config.schema_name)?
            .into_parts();
        errors.extend(invalid.into_iter().map(|item| RecordError {
            record_index: positions[item.index],
            messages: item.messages(),
        }));
        errors.sort_by_key(|e| e.record_index);

        let records: Vec<NormalizedRecord> = valid.into_iter().map(|item| item.record).collect();
        let result = IngestionResult::from_counts(
            records.len(),
            errors,
            started.elapsed().as_secs_f64(),
            content_hash(&records),
            metadata,
        );

        if result.has_data() {
            if let Err(e) = self
                .cache
                .put(name, CacheEntry::new(records, result.clone()))
                .await
            {
                warn!(source = name, error = %e, "Failed to cache records");
            }
        }
        self.record_run(name, result.status).await;

        info!(
            source = name,
            status = %result.status,
            total = result.total_records,
            failed = result.failed_records,
            "Ingested data source"
        );
        Ok(result)
    }

    /// Ingest every enabled source concurrently.
    ///
    /// Configuration errors are folded into a failed result for that source.
    #[instrument(skip(self))]
    pub async fn ingest_all_data(&self, force_refresh: bool) -> HashMap<String, IngestionResult> {
        let configs: Vec<DataSourceConfig> = self
            .sources
            .read()
            .await
            .values()
            .filter(|c| c.enabled)
            .cloned()
            .collect();

        let tasks = configs.iter().map(|config| async move {
            let result = match self
                .ingest_data_source(&config.name, force_refresh, None)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(source = %config.name, error = %e, "Ingestion failed");
                    IngestionResult::load_failure(e.to_string(), 0.0, metadata_for(config))
                }
            };
            (config.name.clone(), result)
        });
        let results: HashMap<String, IngestionResult> = join_all(tasks).await.into_iter().collect();

        let run = IngestionRun {
            timestamp: Utc::now(),
            sources_processed: results.len(),
            statuses: results
                .iter()
                .map(|(name, result)| (name.clone(), result.status))
                .collect(),
        };
        info!(sources = run.sources_processed, "Bulk ingestion finished");
        self.history.write().await.push(run);

        results
    }

    /// Cached valid records of a source, empty if nothing is cached.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be read.
    pub async fn get_cached_data(&self, name: &str) -> Result<Vec<NormalizedRecord>> {
        Ok(self
            .cache
            .get(name)
            .await?
            .map(|entry| entry.records)
            .unwrap_or_default())
    }

    /// Cached valid records of every cached source.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be read.
    pub async fn get_all_cached_data(&self) -> Result<HashMap<String, Vec<NormalizedRecord>>> {
        let mut data = HashMap::new();
        for name in self.cache.sources().await? {
            if let Some(entry) = self.cache.get(&name).await? {
                data.insert(name, entry.records);
            }
        }
        Ok(data)
    }

    /// Cached records of a source as a `DataFrame`.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be read or the frame cannot be built.
    pub async fn get_cached_frame(&self, name: &str) -> Result<DataFrame> {
        let records = self.get_cached_data(name).await?;
        records_to_frame(&records)
    }

    /// Registration and cache state of every registered source.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be read.
    pub async fn get_data_source_status(&self) -> Result<BTreeMap<String, SourceStatus>> {
        let configs = self.data_sources().await;
        let last_runs = self.last_runs.read().await.clone();

        let mut statuses = BTreeMap::new();
        for config in configs {
            let entry = self.cache.get(&config.name).await?;
            let last = last_runs.get(&config.name);
            statuses.insert(
                config.name.clone(),
                SourceStatus {
                    enabled: config.enabled,
                    source_type: config.source_type,
                    schema: config.schema_name,
                    cached_records: entry.as_ref().map_or(0, |e| e.records.len()),
                    data_hash: entry.as_ref().map(|e| e.result.data_hash.clone()),
                    last_ingested: last
                        .map(|l| l.at)
                        .or_else(|| entry.as_ref().map(|e| e.cached_at)),
                    last_status: last
                        .map(|l| l.status)
                        .or_else(|| entry.as_ref().map(|e| e.result.status)),
                },
            );
        }
        Ok(statuses)
    }

    /// Drop every cached set.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be cleared.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        info!("Cleared record cache");
        Ok(())
    }

    /// Drop the cached set of one source.
    ///
    /// Returns true if an entry was removed.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be updated.
    pub async fn clear_source_cache(&self, name: &str) -> Result<bool> {
        self.cache.remove(name).await
    }

    /// Drop cached sets older than `ttl`.
    ///
    /// # Errors
    /// Returns [`IngestError::Cache`] if the cache cannot be updated.
    pub async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let removed = self.cache.invalidate_stale(ttl).await?;
        debug!(removed, "Invalidated stale cache entries");
        Ok(removed)
    }

    /// Bulk ingestion runs, oldest first.
    pub async fn ingestion_history(&self) -> Vec<IngestionRun> {
        self.history.read().await.clone()
    }

    /// Write the cached set of a source to `path`.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    /// Returns [`IngestError::NoCachedData`] if nothing is cached for the
    /// source, or [`IngestError::Io`] if the file cannot be written.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn export_data(
        &self,
        name: &str,
        path: impl AsRef<Path>,
        format: ExportFormat,
    ) -> Result<usize> {
        let records = self.get_cached_data(name).await?;
        if records.is_empty() {
            return Err(IngestError::NoCachedData(name.to_string()));
        }
        write_records(&records, path.as_ref(), format).await?;
        info!(source = name, count = records.len(), %format, "Exported records");
        Ok(records.len())
    }

    async fn fresh_entry(&self, config: &DataSourceConfig) -> Option<CacheEntry> {
        let entry = match self.cache.get(&config.name).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(source = %config.name, error = %e, "Cache read failed, reloading");
                return None;
            }
        };
        match config.refresh_interval() {
            Some(interval) if entry.is_stale(interval) => None,
            _ => Some(entry),
        }
    }

    async fn record_run(&self, name: &str, status: IngestionStatus) {
        self.last_runs.write().await.insert(
            name.to_string(),
            LastRun {
                at: Utc::now(),
                status,
            },
        );
    }
}

fn metadata_for(config: &DataSourceConfig) -> IngestionMetadata {
    IngestionMetadata {
        source: ResultOrigin::for_source_type(config.source_type),
        source_type: config.source_type,
        location: config.path_or_url.clone(),
        schema: config.schema_name.clone(),
        error: None,
    }
}
