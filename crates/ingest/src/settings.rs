//! Runtime settings for the ingestion orchestrator.
//!
//! Every setting has a default and can be overridden through `INGEST_*`
//! environment variables.

use ingest_core::{DataSourceConfig, IngestError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::logging::LogSettings;

/// Default directory relative file sources are resolved against.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default number of records generated per mock source.
pub const DEFAULT_MOCK_RECORDS: usize = 100;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    /// Directory relative file paths are resolved against.
    pub data_dir: PathBuf,
    /// Row cap per load unless a call overrides it; `None` loads every row.
    pub max_records: Option<usize>,
    /// Records generated per mock source.
    pub mock_records: usize,
    /// Timeout for URL sources.
    pub http_timeout: Duration,
    /// SQLite cache file; `None` keeps the cache in memory.
    pub cache_path: Option<PathBuf>,
    /// Logging configuration.
    pub log: LogSettings,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_records: None,
            mock_records: DEFAULT_MOCK_RECORDS,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_path: None,
            log: LogSettings::default(),
        }
    }
}

impl IngestSettings {
    /// Loads settings from the environment.
    ///
    /// Variables:
    /// - `INGEST_DATA_DIR`: data directory
    /// - `INGEST_MAX_RECORDS`: row cap per load
    /// - `INGEST_MOCK_RECORDS`: records per mock source
    /// - `INGEST_HTTP_TIMEOUT_SECS`: URL source timeout in seconds
    /// - `INGEST_CACHE_PATH`: SQLite cache file
    /// - `INGEST_LOG_LEVEL`, `INGEST_LOG_FORMAT`, `INGEST_LOG_FILTER`: logging
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidParameter`] for unparseable values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns [`IngestError::InvalidParameter`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(dir) = lookup("INGEST_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(max) = lookup("INGEST_MAX_RECORDS") {
            settings.max_records = Some(parse_var("INGEST_MAX_RECORDS", &max)?);
        }
        if let Some(count) = lookup("INGEST_MOCK_RECORDS") {
            settings.mock_records = parse_var("INGEST_MOCK_RECORDS", &count)?;
        }
        if let Some(secs) = lookup("INGEST_HTTP_TIMEOUT_SECS") {
            settings.http_timeout = Duration::from_secs(parse_var("INGEST_HTTP_TIMEOUT_SECS", &secs)?);
        }
        settings.cache_path = lookup("INGEST_CACHE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        settings.log = LogSettings::from_lookup(&lookup)?;

        Ok(settings)
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestError::InvalidParameter(format!("{name}={value}: {e}")))
}

/// Reads a JSON array of source configurations.
///
/// # Errors
/// Returns [`IngestError::Io`] if the file cannot be read,
/// [`IngestError::Parse`] if it is not a valid manifest, and
/// [`IngestError::InvalidParameter`] if two sources share a name.
pub async fn load_source_manifest(path: impl AsRef<Path>) -> Result<Vec<DataSourceConfig>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestError::Io(format!("{}: {e}", path.display())))?;
    let configs: Vec<DataSourceConfig> =
        serde_json::from_str(&text).map_err(|e| IngestError::Parse(e.to_string()))?;

    let mut seen = HashSet::new();
    for config in &configs {
        if !seen.insert(config.name.as_str()) {
            return Err(IngestError::InvalidParameter(format!(
                "duplicate source name in manifest: {}",
                config.name
            )));
        }
    }

    debug!(path = %path.display(), sources = configs.len(), "Loaded source manifest");
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use ingest_core::SourceType;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        move |key: &str| vars.get(key).map(ToString::to_string)
    }

    #[test]
    fn test_defaults() {
        let settings = IngestSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, IngestSettings::default());
        assert_eq!(settings.max_records, None);
        assert!(settings.cache_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let settings = IngestSettings::from_lookup(lookup(&[
            ("INGEST_DATA_DIR", "/srv/finance"),
            ("INGEST_MAX_RECORDS", "500"),
            ("INGEST_MOCK_RECORDS", "25"),
            ("INGEST_HTTP_TIMEOUT_SECS", "5"),
            ("INGEST_CACHE_PATH", "/tmp/ingest.db"),
            ("INGEST_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/srv/finance"));
        assert_eq!(settings.max_records, Some(500));
        assert_eq!(settings.mock_records, 25);
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
        assert_eq!(settings.cache_path, Some(PathBuf::from("/tmp/ingest.db")));
        assert_eq!(settings.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_number() {
        let err = IngestSettings::from_lookup(lookup(&[("INGEST_MAX_RECORDS", "lots")])).unwrap_err();
        assert!(matches!(err, IngestError::InvalidParameter(msg) if msg.starts_with("INGEST_MAX_RECORDS")));
    }

    #[tokio::test]
    async fn test_load_source_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "bank", "source_type": "csv", "path_or_url": "bank.csv", "schema_name": "transaction"},
                {"name": "demo", "source_type": "mock", "path_or_url": "", "schema_name": "account",
                 "enabled": false, "refresh_interval": 600}
            ]"#,
        )
        .unwrap();

        let configs = load_source_manifest(&path).await.unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].source_type, SourceType::Csv);
        assert!(configs[0].enabled);
        assert!(!configs[1].enabled);
        assert_eq!(configs[1].refresh_interval(), Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_manifest_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "a", "source_type": "json", "path_or_url": "a.json", "schema_name": "asset"},
                {"name": "a", "source_type": "json", "path_or_url": "b.json", "schema_name": "asset"}
            ]"#,
        )
        .unwrap();

        let err = load_source_manifest(&path).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidParameter(_)));
    }
}
