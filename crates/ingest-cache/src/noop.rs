//! No-op cache implementation.

use async_trait::async_trait;
use ingest_core::{CacheEntry, RecordCache, Result};
use std::time::Duration;
use tracing::trace;

/// A cache that doesn't store anything.
///
/// `get` always returns `Ok(None)`, so every ingestion goes through its loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordCache for NoopCache {
    async fn get(&self, _source: &str) -> Result<Option<CacheEntry>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _source: &str, _entry: CacheEntry) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn remove(&self, _source: &str) -> Result<bool> {
        Ok(false)
    }

    async fn sources(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        trace!("NoopCache: invalidate_stale called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
