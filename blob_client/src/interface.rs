use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Scheme tag marking a chunk that lives on a remote peer rather than in the
/// local store. Sources that support remote chunks strip the tag before
/// resolving; readers carry tagged hashes through verbatim.
pub const REMOTE_SCHEME: &str = "remote://";

/// A provider of decoded blob content, addressed by hash.
///
/// This is the single capability the reader consumes. A source may be a local
/// blob directory, a remote HTTP endpoint, or a caching layer over either; the
/// reader only ever calls `get`.
///
/// The `scope` carries the caller's cancellation signal. Implementations must
/// observe it around any blocking or long-running work and return
/// [`BlobSourceError::Cancelled`](crate::BlobSourceError::Cancelled) once it
/// fires.
#[async_trait::async_trait]
pub trait BlobSource: Send + Sync {
    /// Fetch the full decoded byte content associated with `hash`.
    async fn get(&self, scope: &CancellationToken, hash: &str) -> Result<Bytes>;
}
