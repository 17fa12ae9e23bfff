pub use interface::{BlobSource, REMOTE_SCHEME};
pub use memory_client::MemoryBlobClient;

pub use crate::error::{BlobSourceError, Result};

mod error;
mod interface;
mod memory_client;
