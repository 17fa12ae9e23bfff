use thiserror::Error;

/// Errors a blob source reports on fetch.
///
/// The classification is part of the source contract: `Transient` failures may
/// be retried by a source implementation before surfacing; once surfaced, the
/// reader propagates all of them without its own retry policy.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobSourceError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("transient fetch failure: {0}")]
    Transient(String),

    #[error("fatal fetch failure: {0}")]
    Fatal(String),

    #[error("fetch cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BlobSourceError>;
