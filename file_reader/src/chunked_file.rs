use std::sync::Arc;

use blob_client::BlobSource;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::chunk_cache::ChunkCache;
use crate::error::{FileReaderError, Result};
use crate::file_meta::{ChunkRef, FileMeta};
use crate::offset_index::OffsetIndex;

/// Origin for [`ChunkedFile::seek`].
///
/// `End` uses a subtractive convention: the new cursor is
/// `total_size - offset`, not `total_size + offset`. Existing callers depend
/// on this, so it is preserved as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

/// Random-access reader over one chunked file.
///
/// Holds the file's immutable metadata, an offset index resolving byte
/// offsets to chunks, a blob source to fetch chunk payloads, and an optional
/// exclusively-owned LRU cache in front of the source. Blobs are fetched on
/// the fly; a read never pulls chunks outside the requested range.
///
/// Sequential reads ([`read`](Self::read)) and [`seek`](Self::seek) mutate the
/// cursor and require `&mut self`. Positional reads
/// ([`read_at`](Self::read_at)) leave the cursor alone and may run
/// concurrently on a shared reference; cache access is serialized internally.
pub struct ChunkedFile {
    meta: Arc<FileMeta>,
    index: OffsetIndex,
    // None once closed; the closed state and the released source reference
    // are the same thing.
    source: Option<Arc<dyn BlobSource>>,
    cache: Option<Mutex<ChunkCache>>,
    scope: CancellationToken,
    cursor: u64,
}

impl std::fmt::Debug for ChunkedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedFile")
            .field("meta", &self.meta)
            .field("index", &self.index)
            .field("closed", &self.source.is_none())
            .field("cache", &self.cache)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl ChunkedFile {
    /// Create a reader over `meta`, fetching chunks from `source` through
    /// `cache` (when given). Rejects metadata violating the chunk-sequence
    /// invariants. The cursor starts at 0.
    pub fn new(meta: Arc<FileMeta>, source: &Arc<dyn BlobSource>, cache: Option<ChunkCache>) -> Result<Self> {
        Self::with_scope(meta, source, cache, CancellationToken::new())
    }

    /// Like [`new`](Self::new), with an explicit cancellation scope observed
    /// by every fetch issued through this reader.
    pub fn with_scope(
        meta: Arc<FileMeta>,
        source: &Arc<dyn BlobSource>,
        cache: Option<ChunkCache>,
        scope: CancellationToken,
    ) -> Result<Self> {
        meta.validate()?;
        let index = OffsetIndex::new(&meta);
        Ok(Self {
            meta,
            index,
            source: Some(source.clone()),
            cache: cache.map(Mutex::new),
            scope,
            cursor: 0,
        })
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    /// Total file size in bytes.
    pub fn size(&self) -> u64 {
        self.meta.total_size
    }

    pub fn is_empty(&self) -> bool {
        self.meta.total_size == 0
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    fn source(&self) -> Result<&Arc<dyn BlobSource>> {
        self.source.as_ref().ok_or(FileReaderError::Closed)
    }

    /// Positional read into `buf` starting at `offset`; the cursor is left
    /// unchanged. Returns the number of bytes written:
    /// `min(buf.len(), total_size - offset)`, or 0 at end-of-file.
    pub async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.source()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let total = self.meta.total_size;
        if total == 0 || offset >= total {
            return Ok(0);
        }

        let want = (buf.len() as u64).min(total - offset) as usize;
        let Some(start_pos) = self.index.successor(offset) else {
            return Ok(0);
        };

        let mut written = 0usize;
        let mut pos = start_pos;
        while written < want {
            let Some(chunk) = self.meta.chunks.get(pos) else {
                return Err(FileReaderError::MalformedMeta(format!(
                    "chunk list exhausted at position {pos} with {} of {want} bytes read",
                    written
                )));
            };
            let data = self.fetch_chunk(chunk).await?;

            let chunk_start = self.meta.start_offset(pos);
            let chunk_len = (chunk.end_offset - chunk_start) as usize;
            if data.len() != chunk_len {
                return Err(FileReaderError::MalformedMeta(format!(
                    "chunk {} decoded to {} bytes, metadata declares {}",
                    chunk.hash,
                    data.len(),
                    chunk_len
                )));
            }

            // Only the first chunk is entered mid-way; every following chunk
            // is consumed from its start.
            let slice_start = if written == 0 { (offset - chunk_start) as usize } else { 0 };
            let take = (want - written).min(chunk_len - slice_start);
            buf[written..written + take].copy_from_slice(&data[slice_start..slice_start + take]);
            written += take;
            pos += 1;
        }

        Ok(written)
    }

    /// Sequential read from the cursor, advancing it by the number of bytes
    /// read. Returns 0 at end-of-file. On error the cursor is unchanged.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_at(buf, self.cursor).await?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Reposition the cursor; returns the new cursor offset.
    ///
    /// Seeking past end-of-file is permitted and later reads return 0; a seek
    /// resolving to a negative offset is rejected.
    pub fn seek(&mut self, offset: i64, whence: SeekWhence) -> Result<u64> {
        self.source()?;
        let new_cursor = match whence {
            SeekWhence::Set => i128::from(offset),
            SeekWhence::Cur => i128::from(self.cursor) + i128::from(offset),
            SeekWhence::End => i128::from(self.meta.total_size) - i128::from(offset),
        };
        let new_cursor = u64::try_from(new_cursor).map_err(|_| {
            FileReaderError::InvalidSeek(format!(
                "seek {offset} from {whence:?} resolves to a negative offset (cursor {}, size {})",
                self.cursor, self.meta.total_size
            ))
        })?;
        self.cursor = new_cursor;
        Ok(new_cursor)
    }

    /// Reset the cursor to the start of the file.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Purge and drop the cache, release the source, and mark the reader
    /// unusable; every later operation fails with
    /// [`Closed`](FileReaderError::Closed). Idempotent.
    pub fn close(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.get_mut().purge();
        }
        self.cache = None;
        self.source = None;
    }

    /// Fetch one chunk's payload, cache first, falling back to the source on
    /// a miss and inserting the result. Fetches within one read always arrive
    /// in ascending file-offset order because the read loop walks the chunk
    /// list forward.
    async fn fetch_chunk(&self, chunk: &ChunkRef) -> Result<Bytes> {
        if self.scope.is_cancelled() {
            return Err(FileReaderError::Cancelled);
        }
        let source = self.source()?;

        if let Some(cache) = &self.cache {
            if let Some(data) = cache.lock().await.get(&chunk.hash) {
                debug!(hash = %chunk.hash, position = chunk.position, "chunk cache hit");
                return Ok(data);
            }
        }

        // The cache lock is not held across the fetch; concurrent positional
        // reads may race to fetch the same chunk, and the loser's insert
        // simply refreshes the entry.
        let data = source
            .get(&self.scope, &chunk.hash)
            .await
            .map_err(|e| FileReaderError::fetch_failed(&chunk.hash, e))?;
        debug!(hash = %chunk.hash, position = chunk.position, len = data.len(), "fetched chunk from source");

        if let Some(cache) = &self.cache {
            cache.lock().await.put(chunk.hash.clone(), data.clone());
        }
        Ok(data)
    }
}
