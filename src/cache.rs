//! LRU cache for thumbnail records.

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;

use crate::record::ThumbnailRecord;

/// Capacity used when a zero capacity is requested.
pub const DEFAULT_CAPACITY: usize = 500;

/// Thread-safe LRU cache of thumbnail records keyed by source id.
///
/// Only the scheduler writes to it. Hosts read through [`ThumbnailCache::peek`],
/// which does not disturb the eviction order.
pub struct ThumbnailCache {
    cache: RwLock<LruCache<String, ThumbnailRecord>>,
}

impl ThumbnailCache {
    /// Create a new cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
        }
    }

    /// Look up a record without touching its recency.
    pub fn peek(&self, source_id: &str) -> Option<ThumbnailRecord> {
        self.cache.read().peek(source_id).cloned()
    }

    /// Look up a record and promote it to most-recently-used.
    pub fn get(&self, source_id: &str) -> Option<ThumbnailRecord> {
        self.cache.write().get(source_id).cloned()
    }

    /// Insert or replace a record, evicting the least-recently-used entry if full.
    pub fn put(&self, source_id: impl Into<String>, record: ThumbnailRecord) {
        self.cache.write().put(source_id.into(), record);
    }

    /// Insert `record` only if nothing is cached for `source_id` yet.
    pub fn put_if_absent(&self, source_id: &str, record: ThumbnailRecord) {
        let mut cache = self.cache.write();
        if !cache.contains(source_id) {
            cache.put(source_id.to_string(), record);
        }
    }

    /// Flag a cached record as needing a refetch. Returns false if not cached.
    pub fn mark_outdated(&self, source_id: &str) -> bool {
        match self.cache.write().peek_mut(source_id) {
            Some(record) => {
                record.mark_outdated();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.read().cap().get()
    }

    /// Clear the entire cache.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
