//! Chunked file reader over a content-addressed blob store.
//!
//! A file is described by a [`FileMeta`]: an ordered list of content-addressed
//! chunk references, each carrying the exclusive end-offset of its bytes
//! within the file. [`ChunkedFile`] turns that metadata plus a
//! [`BlobSource`](blob_client::BlobSource) into a random-access, streamable
//! byte interface, resolving offsets through an [`OffsetIndex`] and pulling
//! chunk payloads through an optional per-file LRU [`ChunkCache`].

mod chunk_cache;
mod chunked_file;
mod error;
mod file_meta;
mod offset_index;

pub use chunk_cache::{CacheStats, ChunkCache};
pub use chunked_file::{ChunkedFile, SeekWhence};
pub use error::{FileReaderError, Result};
pub use file_meta::{ChunkRef, FileMeta};
pub use offset_index::OffsetIndex;
