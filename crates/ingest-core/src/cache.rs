//! Cache trait for storing validated record sets.
//!
//! This module defines the [`RecordCache`] trait that provides a unified
//! interface for keeping the most recent valid set of each source.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{error::Result, record::NormalizedRecord, result::IngestionResult};

/// The most recently ingested valid set of one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Valid normalized records in source order.
    pub records: Vec<NormalizedRecord>,
    /// Result of the run that produced the records.
    pub result: IngestionResult,
    /// When the entry was stored.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(records: Vec<NormalizedRecord>, result: IngestionResult) -> Self {
        Self {
            records,
            result,
            cached_at: Utc::now(),
        }
    }

    /// Returns true if the entry is older than `ttl`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }
}

/// Trait for caching validated record sets per source name.
///
/// Entries are replaced wholesale, never merged. Implementations can store
/// data in various backends (in-memory, SQLite, etc.).
#[async_trait]
pub trait RecordCache: Send + Sync {
    /// Retrieves the entry for a source.
    ///
    /// Returns `Ok(Some(entry))` if cached, `Ok(None)` if not.
    async fn get(&self, source: &str) -> Result<Option<CacheEntry>>;

    /// Stores or replaces the entry for a source.
    async fn put(&self, source: &str, entry: CacheEntry) -> Result<()>;

    /// Removes the entry for a source.
    ///
    /// Returns true if an entry was removed.
    async fn remove(&self, source: &str) -> Result<bool>;

    /// Names of all cached sources, sorted.
    async fn sources(&self) -> Result<Vec<String>>;

    /// Removes entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{IngestionMetadata, ResultOrigin};
    use crate::source::SourceType;

    fn entry() -> CacheEntry {
        let metadata = IngestionMetadata {
            source: ResultOrigin::Mock,
            source_type: SourceType::Mock,
            location: "mock".to_string(),
            schema: "account".to_string(),
            error: None,
        };
        CacheEntry::new(
            Vec::new(),
            IngestionResult::from_counts(0, Vec::new(), 0.0, String::new(), metadata),
        )
    }

    #[test]
    fn test_fresh_entry_not_stale() {
        assert!(!entry().is_stale(Duration::from_secs(60)));
    }

    #[test]
    fn test_old_entry_is_stale() {
        let mut old = entry();
        old.cached_at = Utc::now() - TimeDelta::hours(2);
        assert!(old.is_stale(Duration::from_secs(3600)));
        assert!(!old.is_stale(Duration::from_secs(3 * 3600)));
    }
}
