//! Chunk alignment for arbitrary-sized writes.
//!
//! The downloader pushes whatever byte ranges the network produced; the
//! cipher only accepts whole 8 KiB chunks. The aligner buffers the
//! undecrypted remainder across calls and hands back the largest aligned
//! flush each time the residual crosses a chunk boundary.

use tracing::trace;

/// Cipher chunk size (8 KiB).
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Fixed out-of-band prologue preceding chunk 0. Excluded from chunk counting.
pub const PROLOGUE_SIZE: usize = 512;

/// Logical chunk index for an absolute stream offset.
///
/// Offsets inside the prologue map to chunk 0.
pub fn chunk_index_for(offset: u64) -> u64 {
    offset.saturating_sub(PROLOGUE_SIZE as u64) / CHUNK_SIZE as u64
}

/// A whole number of chunks ready for decryption.
#[derive(Debug)]
pub struct AlignedFlush {
    /// Logical index of the first chunk in `bytes`.
    pub chunk_index: u64,
    /// Non-empty, `len() % CHUNK_SIZE == 0`.
    pub bytes: Vec<u8>,
}

/// Accumulates writes into cipher-sized flushes.
///
/// # Invariants
/// - the residual is always shorter than one chunk between calls
/// - the chunk index is recomputed from the absolute offset whenever the
///   residual is empty on entry, tolerating discontinuous writes
#[derive(Debug, Default)]
pub struct ChunkAligner {
    residual: Vec<u8>,
    chunk_index: u64,
}

impl ChunkAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently parked below the next chunk boundary.
    pub fn residual_len(&self) -> usize {
        self.residual.len()
    }

    /// Append `bytes` (located at absolute stream offset `offset`) and flush
    /// the largest aligned multiple of the chunk size, if any.
    pub fn absorb(&mut self, offset: u64, bytes: &[u8]) -> Option<AlignedFlush> {
        if self.residual.is_empty() {
            self.chunk_index = chunk_index_for(offset);
        }
        self.residual.extend_from_slice(bytes);

        let aligned = self.residual.len() - self.residual.len() % CHUNK_SIZE;
        if aligned == 0 {
            return None;
        }

        let rest = self.residual.split_off(aligned);
        let flushed = std::mem::replace(&mut self.residual, rest);
        let chunk_index = self.chunk_index;
        self.chunk_index += (aligned / CHUNK_SIZE) as u64;
        trace!(
            chunk_index,
            chunks = aligned / CHUNK_SIZE,
            residual = self.residual.len(),
            "aligned flush"
        );
        Some(AlignedFlush {
            chunk_index,
            bytes: flushed,
        })
    }

    /// Park an unaligned remainder directly, recording the chunk index its
    /// continuation belongs to. Used for the head region's leftover bytes.
    /// Any previous residual is discarded.
    pub fn park(&mut self, bytes: &[u8], chunk_index: u64) {
        debug_assert!(bytes.len() < CHUNK_SIZE);
        self.residual.clear();
        self.residual.extend_from_slice(bytes);
        self.chunk_index = chunk_index;
    }

    /// Discard the residual. The chunk index is recomputed on the next absorb.
    pub fn reset(&mut self) {
        self.residual.clear();
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn stream(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[rstest]
    #[case::single_call(vec![20_000])]
    #[case::byte_at_a_time_boundary(vec![8191, 1, 8192, 3616])]
    #[case::uneven(vec![100, 7000, 9000, 3900])]
    #[case::chunk_multiples(vec![8192, 8192, 3616])]
    fn test_chunking_invariance(#[case] splits: Vec<usize>) {
        // Contiguous absorbs must flush the same aligned prefix regardless
        // of how the input was split, with the same final residual.
        let total: usize = splits.iter().sum();
        assert_eq!(total, 20_000);
        let data = stream(total);

        let mut aligner = ChunkAligner::new();
        let mut flushed = Vec::new();
        let mut offset = PROLOGUE_SIZE as u64;
        let mut cursor = 0usize;
        for split in splits {
            let part = &data[cursor..cursor + split];
            if let Some(flush) = aligner.absorb(offset, part) {
                flushed.extend_from_slice(&flush.bytes);
            }
            offset += split as u64;
            cursor += split;
        }

        let aligned = total - total % CHUNK_SIZE;
        assert_eq!(flushed, data[..aligned]);
        assert_eq!(aligner.residual_len(), total - aligned);
    }

    #[test]
    fn test_chunk_index_recomputed_on_empty_residual() {
        let mut aligner = ChunkAligner::new();

        let flush = aligner
            .absorb(PROLOGUE_SIZE as u64, &stream(CHUNK_SIZE))
            .unwrap();
        assert_eq!(flush.chunk_index, 0);

        // Discontinuous jump while the residual is empty: index resyncs.
        let jump = PROLOGUE_SIZE as u64 + 10 * CHUNK_SIZE as u64;
        let flush = aligner.absorb(jump, &stream(2 * CHUNK_SIZE)).unwrap();
        assert_eq!(flush.chunk_index, 10);
        assert_eq!(flush.bytes.len(), 2 * CHUNK_SIZE);
    }

    #[test]
    fn test_index_not_recomputed_while_residual_held() {
        let mut aligner = ChunkAligner::new();
        assert!(aligner.absorb(PROLOGUE_SIZE as u64, &[0u8; 100]).is_none());

        // Offset is ignored while a residual is pending; continuation bytes
        // complete chunk 0.
        let flush = aligner
            .absorb(PROLOGUE_SIZE as u64 + 100, &stream(CHUNK_SIZE))
            .unwrap();
        assert_eq!(flush.chunk_index, 0);
        assert_eq!(flush.bytes.len(), CHUNK_SIZE);
        assert_eq!(aligner.residual_len(), 100);
    }

    #[test]
    fn test_park_sets_continuation_index() {
        let mut aligner = ChunkAligner::new();
        aligner.park(&[1, 2, 3], 7);
        assert_eq!(aligner.residual_len(), 3);

        let fill = vec![0u8; CHUNK_SIZE - 3];
        let flush = aligner.absorb(0, &fill).unwrap();
        assert_eq!(flush.chunk_index, 7);
    }

    #[test]
    fn test_reset_clears_residual() {
        let mut aligner = ChunkAligner::new();
        aligner.absorb(PROLOGUE_SIZE as u64, &[0u8; 500]);
        aligner.reset();
        assert_eq!(aligner.residual_len(), 0);
    }

    #[rstest]
    #[case::prologue_start(0, 0)]
    #[case::inside_prologue(511, 0)]
    #[case::chunk_zero(512, 0)]
    #[case::last_byte_of_chunk_zero(512 + 8191, 0)]
    #[case::chunk_one(512 + 8192, 1)]
    #[case::chunk_ten(512 + 10 * 8192, 10)]
    fn test_chunk_index_for(#[case] offset: u64, #[case] expected: u64) {
        assert_eq!(chunk_index_for(offset), expected);
    }
}
