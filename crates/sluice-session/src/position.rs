//! Read/write position bookkeeping for the virtual stream.
//!
//! Three related positions are tracked in one place so they cannot drift:
//! the committed read cursor, an uncommitted pending seek (the engine often
//! seeks and immediately reads, and some engines seek speculatively), and
//! the next expected sequential write offset used for discontinuity
//! detection.

/// Position state of a stream session.
#[derive(Debug, Default)]
pub struct StreamPosition {
    read_pos: u64,
    pending_seek: Option<u64>,
    expected_next: u64,
    total_size: Option<u64>,
}

impl StreamPosition {
    pub fn new(total_size: Option<u64>) -> Self {
        Self {
            total_size,
            ..Self::default()
        }
    }

    /// Declared total stream size, if the host provided one.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Position the next read should serve: the pending seek target if one
    /// exists, otherwise the committed cursor.
    pub fn effective_read_pos(&self) -> u64 {
        self.pending_seek.unwrap_or(self.read_pos)
    }

    /// Record a seek target without committing it. It becomes the committed
    /// cursor once a read is actually served there.
    pub fn begin_virtual_seek(&mut self, target: u64) {
        self.pending_seek = Some(target);
    }

    /// Commit the cursor after serving a positioned read.
    pub fn commit_read(&mut self, new_pos: u64) {
        self.pending_seek = None;
        self.read_pos = new_pos;
    }

    /// Advance the committed cursor after a sequential read.
    pub fn advance_read(&mut self, len: u64) {
        self.read_pos += len;
    }

    /// Drop cursor and pending seek, keeping the total size.
    pub fn reset_read(&mut self) {
        self.read_pos = 0;
        self.pending_seek = None;
    }

    /// Next write offset that continues the sequential stream.
    pub fn expected_next(&self) -> u64 {
        self.expected_next
    }

    /// Whether a write at `offset` continues the sequential stream.
    pub fn is_contiguous(&self, offset: u64) -> bool {
        offset == self.expected_next
    }

    /// Record an accepted write. Saturates: offsets arrive from the FFI
    /// edge and may be hostile.
    pub fn note_write(&mut self, offset: u64, len: u64) {
        self.expected_next = offset.saturating_add(len);
    }

    /// Whether a write at `offset` of `len` bytes touches the declared end.
    pub fn reaches_end(&self, offset: u64, len: u64) -> bool {
        self.total_size
            .is_some_and(|total| offset.saturating_add(len) >= total)
    }
}
