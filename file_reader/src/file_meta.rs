use blob_client::REMOTE_SCHEME;

use crate::error::{FileReaderError, Result};

/// Immutable descriptor of one chunk within a file.
///
/// `hash` is the chunk's identity in the blob store (opaque to the reader,
/// possibly scheme-tagged), `end_offset` the exclusive end byte of the chunk
/// within the file, and `position` its zero-based index in the chunk sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    pub hash: String,
    pub end_offset: u64,
    pub position: usize,
}

/// Decoded header for one file: its total size and ordered chunk list.
///
/// Invariants (checked by [`validate`](FileMeta::validate), enforced at
/// [`ChunkedFile`](crate::ChunkedFile) construction):
/// - `end_offset` values are strictly increasing,
/// - the first chunk starts at byte 0,
/// - the last chunk's `end_offset` equals `total_size`,
/// - an empty file has `total_size == 0` and no chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileMeta {
    pub total_size: u64,
    pub chunks: Vec<ChunkRef>,
}

impl FileMeta {
    /// Build a meta from `(hash, end_offset)` pairs in declaration order,
    /// assigning chunk positions. Does not validate; see [`validate`](Self::validate).
    pub fn new(total_size: u64, chunks: impl IntoIterator<Item = (String, u64)>) -> Self {
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(position, (hash, end_offset))| ChunkRef {
                hash,
                end_offset,
                position,
            })
            .collect();
        Self { total_size, chunks }
    }

    /// Check the chunk-sequence invariants, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.chunks.is_empty() {
            if self.total_size != 0 {
                return Err(FileReaderError::MalformedMeta(format!(
                    "no chunks declared for a file of {} bytes",
                    self.total_size
                )));
            }
            return Ok(());
        }

        let mut prev_end = 0u64;
        for (i, chunk) in self.chunks.iter().enumerate() {
            if chunk.position != i {
                return Err(FileReaderError::MalformedMeta(format!(
                    "chunk {} declares position {}",
                    i, chunk.position
                )));
            }
            if chunk.end_offset <= prev_end {
                return Err(FileReaderError::MalformedMeta(format!(
                    "chunk {} end offset {} does not increase past {}",
                    i, chunk.end_offset, prev_end
                )));
            }
            prev_end = chunk.end_offset;
        }

        if prev_end != self.total_size {
            return Err(FileReaderError::MalformedMeta(format!(
                "last chunk ends at {} but file size is {}",
                prev_end, self.total_size
            )));
        }

        Ok(())
    }

    /// The start offset of the chunk at `position`, derived from its
    /// predecessor's end offset (0 for the first chunk).
    pub fn start_offset(&self, position: usize) -> u64 {
        if position == 0 {
            0
        } else {
            self.chunks[position - 1].end_offset
        }
    }

    /// The decoded length of the chunk at `position`.
    pub fn chunk_len(&self, position: usize) -> u64 {
        self.chunks[position].end_offset - self.start_offset(position)
    }

    /// A copy of this meta whose chunk hashes carry the remote scheme tag,
    /// for files whose chunks live on a remote peer. Already-tagged hashes
    /// are left as-is.
    pub fn with_remote_chunks(&self) -> Self {
        let chunks = self
            .chunks
            .iter()
            .map(|c| ChunkRef {
                hash: if c.hash.starts_with(REMOTE_SCHEME) {
                    c.hash.clone()
                } else {
                    format!("{REMOTE_SCHEME}{}", c.hash)
                },
                end_offset: c.end_offset,
                position: c.position,
            })
            .collect();
        Self {
            total_size: self.total_size,
            chunks,
        }
    }
}
