//! In-memory cache implementation.

use async_trait::async_trait;
use ingest_core::{CacheEntry, RecordCache, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Process-local cache keyed by source name.
///
/// Entries live in a `RwLock`-protected `HashMap` and are lost when the cache
/// is dropped. Records are cloned on get and moved in on put.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordCache for InMemoryCache {
    #[instrument(skip(self), fields(source = %source))]
    async fn get(&self, source: &str) -> Result<Option<CacheEntry>> {
        let cache = self.entries.read().await;
        match cache.get(source) {
            Some(entry) => {
                debug!(records = entry.records.len(), "Cache hit");
                Ok(Some(entry.clone()))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, entry), fields(source = %source))]
    async fn put(&self, source: &str, entry: CacheEntry) -> Result<()> {
        let count = entry.records.len();
        self.entries.write().await.insert(source.to_string(), entry);
        debug!("Cached {count} records");
        Ok(())
    }

    async fn remove(&self, source: &str) -> Result<bool> {
        let removed = self.entries.write().await.remove(source).is_some();
        debug!(source, removed, "Removed cache entry");
        Ok(removed)
    }

    async fn sources(&self) -> Result<Vec<String>> {
        let mut names: Vec<_> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(ttl));
        let removed = before - cache.len();

        debug!("Invalidated {removed} stale cache entries");
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}
