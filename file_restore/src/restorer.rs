use std::path::Path;
use std::sync::Arc;

use blob_client::BlobSource;
use file_reader::{ChunkCache, ChunkedFile, FileMeta};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FileRestoreError, Result};
use crate::sink::{FileSink, RestoreSink};

/// Tunables for one restore run.
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Chunks kept in the per-file cache. 0 disables the cache entirely and
    /// every read goes to the source.
    pub cache_capacity: usize,
    /// Size of the intermediate copy buffer used when streaming to the sink.
    pub read_buffer_size: usize,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 5,
            read_buffer_size: 64 * 1024,
        }
    }
}

/// Outcome of a completed restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub bytes_written: u64,
    /// Lowercase hex blake3 digest of the restored content.
    pub content_hash: String,
}

/// Wire shape of a file's root metadata blob.
#[derive(Serialize, Deserialize)]
struct RawFileMeta {
    total_size: u64,
    chunks: Vec<RawChunkRef>,
}

#[derive(Serialize, Deserialize)]
struct RawChunkRef {
    end_offset: u64,
    hash: String,
}

fn decode_meta(raw: &[u8]) -> Result<FileMeta> {
    let raw: RawFileMeta = serde_json::from_slice(raw)
        .map_err(|e| FileRestoreError::MalformedMeta(format!("failed to decode root metadata: {e}")))?;
    Ok(FileMeta::new(raw.total_size, raw.chunks.into_iter().map(|c| (c.hash, c.end_offset))))
}

/// Restores a file from its content-addressed chunks: fetches the root
/// metadata blob, streams the chunk contents through a [`ChunkedFile`] with a
/// fresh cache into a sink, and verifies the restored size (and, when an
/// expected digest is supplied, the content hash).
pub struct FileRestorer {
    source: Arc<dyn BlobSource>,
    root_hash: String,
    config: RestoreConfig,
    expected_hash: Option<String>,
    scope: CancellationToken,
}

impl FileRestorer {
    pub fn new(source: &Arc<dyn BlobSource>, root_hash: impl Into<String>) -> Self {
        Self {
            source: source.clone(),
            root_hash: root_hash.into(),
            config: RestoreConfig::default(),
            expected_hash: None,
            scope: CancellationToken::new(),
        }
    }

    pub fn with_config(self, config: RestoreConfig) -> Self {
        Self { config, ..self }
    }

    /// Expected lowercase hex blake3 digest of the whole file; when set, the
    /// restore fails with `HashMismatch` if the streamed content diverges.
    pub fn with_expected_hash(self, expected_hash: impl Into<String>) -> Self {
        Self {
            expected_hash: Some(expected_hash.into()),
            ..self
        }
    }

    pub fn with_scope(self, scope: CancellationToken) -> Self {
        Self { scope, ..self }
    }

    /// Run the restore, writing every byte to `sink`.
    pub async fn run(self, sink: &mut dyn RestoreSink) -> Result<RestoreSummary> {
        info!(root_hash = %self.root_hash, "starting file restore");

        let raw_meta = self.source.get(&self.scope, &self.root_hash).await?;
        let meta = Arc::new(decode_meta(&raw_meta)?);
        let total_size = meta.total_size;

        let cache = if self.config.cache_capacity == 0 {
            debug!("chunk cache capacity set to 0, restoring without a cache");
            None
        } else {
            Some(ChunkCache::new(self.config.cache_capacity)?)
        };

        let mut file = ChunkedFile::with_scope(meta, &self.source, cache, self.scope.clone())?;

        let mut hasher = blake3::Hasher::new();
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let mut bytes_written = 0u64;
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            write_all(sink, &buf[..n])?;
            bytes_written += n as u64;
        }
        file.close();

        let sink_size = sink.size()?;
        if sink_size != total_size {
            return Err(FileRestoreError::SizeMismatch {
                expected: total_size,
                actual: sink_size,
            });
        }

        let content_hash = hasher.finalize().to_hex().to_string();
        if let Some(expected) = &self.expected_hash {
            if !expected.eq_ignore_ascii_case(&content_hash) {
                warn!(root_hash = %self.root_hash, expected = %expected, actual = %content_hash, "restored content hash diverges");
                return Err(FileRestoreError::HashMismatch {
                    expected: expected.clone(),
                    actual: content_hash,
                });
            }
        }

        info!(root_hash = %self.root_hash, bytes_written, "file restore complete");
        Ok(RestoreSummary {
            bytes_written,
            content_hash,
        })
    }
}

/// Download the file rooted at `root_hash` to `path`.
pub async fn restore_to_path(
    source: &Arc<dyn BlobSource>,
    root_hash: &str,
    path: impl AsRef<Path>,
) -> Result<RestoreSummary> {
    let mut sink = FileSink::create(path)?;
    FileRestorer::new(source, root_hash).run(&mut sink).await
}

fn write_all(sink: &mut dyn RestoreSink, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let n = sink.write(data)?;
        if n == 0 {
            return Err(FileRestoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "sink accepted no bytes",
            )));
        }
        data = &data[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use blob_client::{BlobSourceError, MemoryBlobClient};
    use bytes::Bytes;
    use file_reader::FileReaderError;

    use super::*;
    use crate::sink::BufferSink;

    /// Upload `chunks` plus a root metadata blob; returns the root hash and
    /// the full expected contents.
    fn upload_file(client: &Arc<MemoryBlobClient>, root_hash: &str, chunks: &[(&str, &[u8])]) -> Vec<u8> {
        let mut contents = Vec::new();
        let mut refs = Vec::new();
        for (hash, data) in chunks {
            client.insert(*hash, Bytes::copy_from_slice(data));
            contents.extend_from_slice(data);
            refs.push(RawChunkRef {
                end_offset: contents.len() as u64,
                hash: hash.to_string(),
            });
        }
        let meta = RawFileMeta {
            total_size: contents.len() as u64,
            chunks: refs,
        };
        client.insert(root_hash, serde_json::to_vec(&meta).unwrap());
        contents
    }

    fn source_of(client: &Arc<MemoryBlobClient>) -> Arc<dyn BlobSource> {
        client.clone()
    }

    #[tokio::test]
    async fn test_restore_to_buffer() {
        let client = MemoryBlobClient::new();
        let contents = upload_file(&client, "root", &[("A", b"foo"), ("B", b"barbaz"), ("C", b"qux")]);
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let summary = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap();

        assert_eq!(sink.as_slice(), contents);
        assert_eq!(summary.bytes_written, contents.len() as u64);
        assert_eq!(summary.content_hash, blake3::hash(&contents).to_hex().to_string());
        // Root blob plus one fetch per chunk; the default cache absorbs the rest.
        assert_eq!(client.total_fetches(), 4);
    }

    #[tokio::test]
    async fn test_restore_empty_file() {
        let client = MemoryBlobClient::new();
        upload_file(&client, "root", &[]);
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let summary = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap();

        assert!(sink.as_slice().is_empty());
        assert_eq!(summary.bytes_written, 0);
        assert_eq!(summary.content_hash, blake3::hash(b"").to_hex().to_string());
    }

    #[tokio::test]
    async fn test_restore_to_path() {
        let client = MemoryBlobClient::new();
        let contents = upload_file(&client, "root", &[("A", b"hello "), ("B", b"world")]);
        let source = source_of(&client);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restored.bin");
        let summary = restore_to_path(&source, "root", &path).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), contents);
        assert_eq!(summary.bytes_written, contents.len() as u64);
    }

    #[tokio::test]
    async fn test_small_read_buffer_still_reassembles() {
        let client = MemoryBlobClient::new();
        let contents = upload_file(&client, "root", &[("A", b"foo"), ("B", b"barbaz")]);
        let source = source_of(&client);

        let config = RestoreConfig {
            read_buffer_size: 2,
            ..Default::default()
        };
        let mut sink = BufferSink::new();
        FileRestorer::new(&source, "root")
            .with_config(config)
            .run(&mut sink)
            .await
            .unwrap();
        assert_eq!(sink.as_slice(), contents);
        // A tiny copy buffer re-reads chunks, but the cache keeps it to one
        // source fetch per chunk (plus the root blob).
        assert_eq!(client.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_zero_cache_capacity_disables_cache() {
        let client = MemoryBlobClient::new();
        upload_file(&client, "root", &[("A", b"foo"), ("B", b"barbaz")]);
        let source = source_of(&client);

        let config = RestoreConfig {
            cache_capacity: 0,
            read_buffer_size: 2,
            ..Default::default()
        };
        let mut sink = BufferSink::new();
        FileRestorer::new(&source, "root")
            .with_config(config)
            .run(&mut sink)
            .await
            .unwrap();
        // Without a cache every 2-byte read re-fetches the covering chunk.
        assert!(client.total_fetches() > 3);
    }

    #[tokio::test]
    async fn test_expected_hash_verified() {
        let client = MemoryBlobClient::new();
        let contents = upload_file(&client, "root", &[("A", b"foo"), ("B", b"barbaz")]);
        let source = source_of(&client);
        let digest = blake3::hash(&contents).to_hex().to_string();

        let mut sink = BufferSink::new();
        FileRestorer::new(&source, "root")
            .with_expected_hash(digest.to_uppercase())
            .run(&mut sink)
            .await
            .unwrap();

        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root")
            .with_expected_hash("0".repeat(64))
            .run(&mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, FileRestoreError::HashMismatch { .. }));
    }

    #[tokio::test]
    async fn test_size_mismatch_from_lying_sink() {
        struct PaddedSink(BufferSink);
        impl RestoreSink for PaddedSink {
            fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
                self.0.write(data)
            }
            fn size(&self) -> std::io::Result<u64> {
                Ok(self.0.size()? + 1)
            }
        }

        let client = MemoryBlobClient::new();
        upload_file(&client, "root", &[("A", b"foo")]);
        let source = source_of(&client);

        let mut sink = PaddedSink(BufferSink::new());
        let err = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap_err();
        assert!(matches!(err, FileRestoreError::SizeMismatch { expected: 3, actual: 4 }));
    }

    #[tokio::test]
    async fn test_undecodable_root_metadata() {
        let client = MemoryBlobClient::new();
        client.insert("root", &b"not json at all"[..]);
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap_err();
        assert!(matches!(err, FileRestoreError::MalformedMeta(_)));
    }

    #[tokio::test]
    async fn test_inconsistent_chunk_sequence_rejected() {
        let client = MemoryBlobClient::new();
        let meta = RawFileMeta {
            total_size: 10,
            chunks: vec![
                RawChunkRef {
                    end_offset: 5,
                    hash: "A".to_string(),
                },
                RawChunkRef {
                    end_offset: 4,
                    hash: "B".to_string(),
                },
            ],
        };
        client.insert("root", serde_json::to_vec(&meta).unwrap());
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap_err();
        assert!(matches!(err, FileRestoreError::ReaderError(FileReaderError::MalformedMeta(_))));
    }

    #[tokio::test]
    async fn test_missing_root_blob() {
        let client = MemoryBlobClient::new();
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap_err();
        assert!(matches!(err, FileRestoreError::SourceError(BlobSourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_chunk_blob() {
        let client = MemoryBlobClient::new();
        upload_file(&client, "root", &[("A", b"foo"), ("B", b"barbaz")]);
        client.inject_failure("B", BlobSourceError::NotFound("B".to_string()));
        let source = source_of(&client);

        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root").run(&mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            FileRestoreError::ReaderError(FileReaderError::FetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_scope_aborts_restore() {
        let client = MemoryBlobClient::new();
        upload_file(&client, "root", &[("A", b"foo")]);
        let source = source_of(&client);

        let scope = CancellationToken::new();
        scope.cancel();
        let mut sink = BufferSink::new();
        let err = FileRestorer::new(&source, "root")
            .with_scope(scope)
            .run(&mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, FileRestoreError::SourceError(BlobSourceError::Cancelled)));
    }
}
