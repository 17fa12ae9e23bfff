use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Destination for restored bytes.
///
/// `size` reports how many bytes the sink currently holds; the restorer
/// checks it against the declared file size after streaming completes.
/// Closing or syncing the underlying resource is the caller's concern.
pub trait RestoreSink: Send {
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
    fn size(&self) -> io::Result<u64>;
}

/// Sink writing to a freshly created (truncated) file on disk.
pub struct FileSink {
    file: File,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }
}

impl RestoreSink for FileSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

/// In-memory sink, mainly for tests and small restores.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl RestoreSink for BufferSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.buf.len() as u64)
    }
}
