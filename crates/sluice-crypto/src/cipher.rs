use crate::CryptoError;

/// Capability interface for the chunk cipher.
///
/// Implementations keep an internal chunk cursor: [`decrypt`](Self::decrypt)
/// consumes whole chunks starting at the cursor and advances it. The ingest
/// path reseeds the cursor with [`seek_chunk`](Self::seek_chunk) whenever it
/// resumes at a known chunk boundary, so discontinuous writes never require
/// re-processing from the stream start.
pub trait ChunkCipher {
    /// Position the internal cursor at a logical chunk index.
    fn seek_chunk(&mut self, index: u64);

    /// Decrypt `buf` in place. `buf.len()` must be a whole number of chunks;
    /// the cursor advances by that many chunks on success.
    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;
}
