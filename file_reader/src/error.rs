use blob_client::BlobSourceError;
use thiserror::Error;

/// Errors surfaced by the chunked file reader.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileReaderError {
    /// The chunk list violates a metadata invariant, or fetched chunk content
    /// contradicts the metadata. Never retried; carries the offending detail.
    #[error("malformed file metadata: {0}")]
    MalformedMeta(String),

    #[error("invalid seek: {0}")]
    InvalidSeek(String),

    #[error("file reader is closed")]
    Closed,

    #[error("failed to fetch chunk {hash}: {cause}")]
    FetchFailed { hash: String, cause: BlobSourceError },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FileReaderError>;

impl FileReaderError {
    /// Wrap a source error for `hash`, preserving cancellation as its own
    /// variant so callers can distinguish it from transport failures.
    pub(crate) fn fetch_failed(hash: &str, cause: BlobSourceError) -> Self {
        match cause {
            BlobSourceError::Cancelled => FileReaderError::Cancelled,
            cause => FileReaderError::FetchFailed {
                hash: hash.to_string(),
                cause,
            },
        }
    }
}
