use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{BlobSourceError, Result};
use crate::interface::{BlobSource, REMOTE_SCHEME};

/// An in-memory blob source.
///
/// Effectively, the map of hash to bytes is the store endpoint; the client
/// keeps per-hash fetch counters so callers can verify how many round trips a
/// read path actually performed, and supports injecting a failure for a given
/// hash to exercise error propagation.
///
/// Hashes carrying the `remote://` scheme tag resolve against the same map
/// with the tag stripped; interpreting the scheme is the source's job, not the
/// reader's.
#[derive(Default)]
pub struct MemoryBlobClient {
    blobs: RwLock<HashMap<String, Bytes>>,
    fetch_counts: Mutex<HashMap<String, u64>>,
    injected_failures: Mutex<HashMap<String, BlobSourceError>>,
    total_fetches: AtomicU64,
}

impl MemoryBlobClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a blob under `hash`, replacing any previous content.
    pub fn insert(&self, hash: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs.write().unwrap().insert(hash.into(), data.into());
    }

    /// Make every subsequent `get` for `hash` return `error` instead of data.
    pub fn inject_failure(&self, hash: impl Into<String>, error: BlobSourceError) {
        self.injected_failures.lock().unwrap().insert(hash.into(), error);
    }

    /// Clear a previously injected failure for `hash`.
    pub fn clear_failure(&self, hash: &str) {
        self.injected_failures.lock().unwrap().remove(hash);
    }

    /// Number of `get` calls that reached this client for `hash`.
    pub fn fetch_count(&self, hash: &str) -> u64 {
        self.fetch_counts.lock().unwrap().get(hash).copied().unwrap_or(0)
    }

    /// Number of `get` calls that reached this client across all hashes.
    pub fn total_fetches(&self) -> u64 {
        self.total_fetches.load(Ordering::Relaxed)
    }

    /// Reset all fetch counters to zero.
    pub fn reset_fetch_counts(&self) {
        self.fetch_counts.lock().unwrap().clear();
        self.total_fetches.store(0, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl BlobSource for MemoryBlobClient {
    async fn get(&self, scope: &CancellationToken, hash: &str) -> Result<Bytes> {
        if scope.is_cancelled() {
            return Err(BlobSourceError::Cancelled);
        }

        self.total_fetches.fetch_add(1, Ordering::Relaxed);
        *self.fetch_counts.lock().unwrap().entry(hash.to_string()).or_insert(0) += 1;

        if let Some(err) = self.injected_failures.lock().unwrap().get(hash) {
            return Err(err.clone());
        }

        let key = hash.strip_prefix(REMOTE_SCHEME).unwrap_or(hash);
        let data = self
            .blobs
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobSourceError::NotFound(hash.to_string()))?;

        debug!(hash, len = data.len(), "served blob from memory client");
        Ok(data)
    }
}
