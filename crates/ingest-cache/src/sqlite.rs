//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeDelta, Utc};
use ingest_core::{CacheEntry, IngestError, RecordCache, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};

/// SQLite-based cache for validated record sets.
///
/// Each source occupies one row holding its JSON-encoded [`CacheEntry`], so
/// cached sets survive application restarts.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| IngestError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| IngestError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS record_cache (
                source TEXT PRIMARY KEY,
                entry_json TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| IngestError::Cache(e.to_string()))?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

/// Fixed-width UTC timestamps so `cached_at` compares correctly as text.
fn timestamp_key(dt: chrono::DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl RecordCache for SqliteCache {
    #[instrument(skip(self), fields(source = %source))]
    async fn get(&self, source: &str) -> Result<Option<CacheEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        let json: Option<String> = conn
            .query_row(
                "SELECT entry_json FROM record_cache WHERE source = ?1",
                params![source],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        match json {
            Some(json) => {
                let entry: CacheEntry =
                    serde_json::from_str(&json).map_err(|e| IngestError::Cache(e.to_string()))?;
                debug!(records = entry.records.len(), "Cache hit");
                Ok(Some(entry))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, entry), fields(source = %source))]
    async fn put(&self, source: &str, entry: CacheEntry) -> Result<()> {
        let json = serde_json::to_string(&entry).map_err(|e| IngestError::Cache(e.to_string()))?;
        let cached_at = timestamp_key(entry.cached_at);

        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO record_cache (source, entry_json, cached_at)
             VALUES (?1, ?2, ?3)",
            params![source, json, cached_at],
        )
        .map_err(|e| IngestError::Cache(e.to_string()))?;

        debug!("Cached {} records", entry.records.len());
        Ok(())
    }

    async fn remove(&self, source: &str) -> Result<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        let deleted = conn
            .execute(
                "DELETE FROM record_cache WHERE source = ?1",
                params![source],
            )
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn sources(&self) -> Result<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT source FROM record_cache ORDER BY source")
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| IngestError::Cache(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        Ok(names)
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - TimeDelta::from_std(ttl)
                .map_err(|e| IngestError::Cache(format!("Invalid TTL duration: {e}")))?;
        let cutoff = timestamp_key(cutoff);

        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        let deleted = conn
            .execute(
                "DELETE FROM record_cache WHERE cached_at < ?1",
                params![cutoff],
            )
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        debug!("Invalidated {deleted} stale cache entries");
        Ok(deleted)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| IngestError::Cache(e.to_string()))?;
        conn.execute("DELETE FROM record_cache", [])
            .map_err(|e| IngestError::Cache(e.to_string()))?;

        debug!("Cleared all cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::entry;

    #[tokio::test]
    async fn test_sqlite_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[tokio::test]
    async fn test_entry_roundtrip() {
        let cache = SqliteCache::in_memory().unwrap();
        assert!(cache.get("accounts").await.unwrap().is_none());

        let stored = entry(&["acc_1", "acc_2"]);
        cache.put("accounts", stored.clone()).await.unwrap();

        let cached = cache.get("accounts").await.unwrap().unwrap();
        assert_eq!(cached.records, stored.records);
        assert_eq!(cached.result.data_hash, stored.result.data_hash);
        assert_eq!(cached.cached_at, stored.cached_at);
    }

    #[tokio::test]
    async fn test_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let cache = SqliteCache::new(&path).unwrap();
            cache.put("assets", entry(&["ast_1"])).await.unwrap();
        }

        let reopened = SqliteCache::new(&path).unwrap();
        let cached = reopened.get("assets").await.unwrap().unwrap();
        assert_eq!(cached.records[0].id(), Some("ast_1"));
    }

    #[tokio::test]
    async fn test_remove_sources_and_clear() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("liabilities", entry(&["lia_1"])).await.unwrap();
        cache.put("accounts", entry(&["acc_1"])).await.unwrap();
        assert_eq!(
            cache.sources().await.unwrap(),
            vec!["accounts", "liabilities"]
        );

        assert!(cache.remove("accounts").await.unwrap());
        assert!(!cache.remove("accounts").await.unwrap());

        cache.clear().await.unwrap();
        assert!(cache.sources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_stale() {
        let cache = SqliteCache::in_memory().unwrap();
        let mut old = entry(&["acc_1"]);
        old.cached_at = Utc::now() - TimeDelta::days(2);
        cache.put("old", old).await.unwrap();
        cache.put("fresh", entry(&["acc_2"])).await.unwrap();

        let removed = cache
            .invalidate_stale(Duration::from_secs(24 * 3600))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.sources().await.unwrap(), vec!["fresh"]);
    }
}
