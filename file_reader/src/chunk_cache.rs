use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;

use crate::error::{FileReaderError, Result};

/// Hit/miss/eviction counters for one cache.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded per-file LRU cache of decoded chunk bytes, keyed by chunk hash.
///
/// Owned by exactly one reader; purged when that reader closes. Entries are
/// immutable [`Bytes`], so a cached payload can be handed out as a cheap
/// clone without copying.
#[derive(Debug)]
pub struct ChunkCache {
    entries: LruCache<String, Bytes>,
    stats: CacheStats,
}

impl ChunkCache {
    /// Create a cache holding at most `capacity` chunks.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| FileReaderError::InvalidConfig("chunk cache capacity must be > 0".to_string()))?;
        Ok(Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        })
    }

    /// Look up `hash`, refreshing its recency on a hit.
    pub fn get(&mut self, hash: &str) -> Option<Bytes> {
        match self.entries.get(hash) {
            Some(data) => {
                self.stats.hits += 1;
                Some(data.clone())
            },
            None => {
                self.stats.misses += 1;
                None
            },
        }
    }

    /// Insert `hash` as most-recently-used, evicting from the LRU end if the
    /// cache is full. Re-inserting an existing key replaces its bytes and
    /// refreshes recency; a put never fails.
    pub fn put(&mut self, hash: impl Into<String>, data: Bytes) {
        let hash = hash.into();
        if let Some((evicted_hash, _)) = self.entries.push(hash.clone(), data) {
            // push also returns the old entry when the key was already
            // present; only a different key means an actual eviction.
            if evicted_hash != hash {
                self.stats.evictions += 1;
            }
        }
    }

    /// Drop all entries. Idempotent; counters are retained.
    pub fn purge(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
