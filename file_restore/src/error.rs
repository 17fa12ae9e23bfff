use blob_client::BlobSourceError;
use file_reader::FileReaderError;
use thiserror::Error;

/// Errors that can occur while restoring a file from the blob store.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FileRestoreError {
    #[error("Blob Source Error: {0}")]
    SourceError(#[from] BlobSourceError),

    #[error("File Reader Error: {0}")]
    ReaderError(#[from] FileReaderError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("malformed root metadata: {0}")]
    MalformedMeta(String),

    #[error("restored size mismatch: expected {expected} bytes, sink holds {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("restored content hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },
}

pub type Result<T> = std::result::Result<T, FileRestoreError>;
