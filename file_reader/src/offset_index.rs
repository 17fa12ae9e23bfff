use crate::file_meta::FileMeta;

/// Ordered index from byte offset to containing chunk.
///
/// Keyed on each chunk's exclusive `end_offset`; the chunk covering an offset
/// is the one with the smallest end offset strictly greater than it. A sorted
/// array with binary search answers the successor query in O(log n), which is
/// ample at realistic chunk counts.
///
/// Built once at reader construction, immutable thereafter.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    end_offsets: Vec<u64>,
}

impl OffsetIndex {
    pub fn new(meta: &FileMeta) -> Self {
        Self {
            end_offsets: meta.chunks.iter().map(|c| c.end_offset).collect(),
        }
    }

    /// The position of the chunk whose byte range contains `offset`, or
    /// `None` when `offset` is at or past end-of-file.
    ///
    /// Because end offsets are exclusive, an offset sitting on a chunk
    /// boundary belongs to the following chunk.
    pub fn successor(&self, offset: u64) -> Option<usize> {
        let pos = self.end_offsets.partition_point(|&end| end <= offset);
        (pos < self.end_offsets.len()).then_some(pos)
    }

    pub fn len(&self) -> usize {
        self.end_offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.end_offsets.is_empty()
    }
}
