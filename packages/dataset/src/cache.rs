//! Time-boxed cache for the normalized dataset.
//!
//! An entry is served until it is older than the configured TTL or until
//! it is explicitly cleared. Failed loads are never cached, so a broken
//! store is retried on the next interaction.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::Dataset;
use crate::fingerprint::fingerprint;

/// Default freshness window for a loaded dataset.
pub const DEFAULT_TTL: TimeDelta = TimeDelta::minutes(5);

/// A cached dataset together with when it was loaded and its fingerprint.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The normalized dataset.
    pub dataset: Arc<Dataset>,
    /// Fingerprint of `dataset` at load time.
    pub fingerprint: String,
    /// When the entry was stored.
    pub loaded_at: DateTime<Utc>,
}

/// Single-slot TTL cache for the dataset loaded from the store.
#[derive(Debug)]
pub struct DatasetCache {
    ttl: TimeDelta,
    entry: Option<CacheEntry>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DatasetCache {
    /// Creates an empty cache with the given TTL.
    #[must_use]
    pub const fn new(ttl: TimeDelta) -> Self {
        Self { ttl, entry: None }
    }

    /// Returns the cached entry if it is still fresh at `now`.
    #[must_use]
    pub fn get(&self, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entry
            .as_ref()
            .filter(|entry| now.signed_duration_since(entry.loaded_at) < self.ttl)
    }

    /// Stores a freshly loaded dataset and returns the new entry.
    pub fn insert(&mut self, dataset: Dataset, now: DateTime<Utc>) -> &CacheEntry {
        let fingerprint = fingerprint(&dataset);
        log::debug!("Caching dataset with {} rows ({fingerprint})", dataset.len());
        self.entry.insert(CacheEntry {
            dataset: Arc::new(dataset),
            fingerprint,
            loaded_at: now,
        })
    }

    /// Drops the cached entry.
    pub fn clear(&mut self) {
        if self.entry.take().is_some() {
            log::debug!("Dataset cache cleared");
        }
    }

    /// The configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellValue;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn dataset() -> Dataset {
        Dataset::with_rows(vec!["a".to_string()], vec![vec![CellValue::from("x")]]).unwrap()
    }

    #[test]
    fn serves_fresh_entries() {
        let mut cache = DatasetCache::default();
        cache.insert(dataset(), now());
        assert!(cache.get(now() + TimeDelta::minutes(4)).is_some());
    }

    #[test]
    fn expires_after_ttl() {
        let mut cache = DatasetCache::default();
        cache.insert(dataset(), now());
        assert!(cache.get(now() + TimeDelta::minutes(5)).is_none());
    }

    #[test]
    fn clear_drops_entry() {
        let mut cache = DatasetCache::new(TimeDelta::hours(1));
        cache.insert(dataset(), now());
        cache.clear();
        assert!(cache.get(now()).is_none());
    }

    #[test]
    fn entry_carries_fingerprint() {
        let mut cache = DatasetCache::default();
        let entry = cache.insert(dataset(), now());
        assert_eq!(entry.fingerprint, fingerprint(&dataset()));
    }
}
