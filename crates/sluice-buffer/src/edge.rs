//! Cached head/tail edge regions.
//!
//! The downloader supplies the file head (for container probing) and the
//! file tail (byte-exact index data) out of band, before or independently
//! from the sequential stream. Probe-phase reads are served from these
//! cached regions so the demuxer can finish stream analysis without
//! touching live stream bytes.

use tracing::trace;

/// Names the two fixed-position regions. At most one region per tag is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeTag {
    Head,
    Tail,
}

/// A contiguous byte range tagged with its absolute stream offset.
#[derive(Debug)]
pub struct EdgeRegion {
    offset: u64,
    bytes: Vec<u8>,
}

impl EdgeRegion {
    /// Absolute stream offset of the first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn contains(&self, pos: u64) -> bool {
        pos >= self.offset && pos < self.offset + self.bytes.len() as u64
    }
}

/// Holds the live head and tail regions.
#[derive(Debug, Default)]
pub struct EdgeBufferStore {
    head: Option<EdgeRegion>,
    tail: Option<EdgeRegion>,
}

impl EdgeBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a region, replacing any previous region with the same tag.
    /// The old buffer is dropped before the new one is visible.
    pub fn set_region(&mut self, tag: EdgeTag, offset: u64, bytes: Vec<u8>) {
        let slot = match tag {
            EdgeTag::Head => &mut self.head,
            EdgeTag::Tail => &mut self.tail,
        };
        trace!(?tag, offset, len = bytes.len(), "edge region installed");
        *slot = Some(EdgeRegion { offset, bytes });
    }

    pub fn region(&self, tag: EdgeTag) -> Option<&EdgeRegion> {
        match tag {
            EdgeTag::Head => self.head.as_ref(),
            EdgeTag::Tail => self.tail.as_ref(),
        }
    }

    /// Sub-slice of the named region if `pos` falls inside it.
    pub fn try_read(&self, tag: EdgeTag, pos: u64, max_len: usize) -> Option<&[u8]> {
        let region = self.region(tag)?;
        if !region.contains(pos) {
            return None;
        }
        let start = (pos - region.offset) as usize;
        let end = (start + max_len).min(region.bytes.len());
        Some(&region.bytes[start..end])
    }

    /// Copy bytes at `pos` into `out`, checking head then tail.
    /// Returns bytes copied (0 if neither region covers `pos`).
    pub fn read_at(&self, pos: u64, out: &mut [u8]) -> usize {
        for tag in [EdgeTag::Head, EdgeTag::Tail] {
            if let Some(slice) = self.try_read(tag, pos, out.len()) {
                out[..slice.len()].copy_from_slice(slice);
                return slice.len();
            }
        }
        0
    }

    /// Drop both regions.
    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
    }
}
