//! Ingest routing for pushed data.
//!
//! The downloader pushes three kinds of data, distinguished by a wire tag:
//! the file head (probe data, may carry the encryption prologue), the
//! sequential stream body, and the file tail (index data). Each kind lands
//! in a different buffer; stream data additionally passes through chunk
//! alignment and decryption.

use sluice_buffer::{DownloaderControl, EdgeTag};
use sluice_crypto::{
    Aes128ChunkCipher, CHUNK_SIZE, ChunkCipher, PROLOGUE_SIZE, chunk_index_for, parse_prologue,
};
use tracing::{debug, trace, warn};

use crate::error::{SessionError, SessionResult};
use crate::state::SessionCore;

/// Wire tag attached to every pushed buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// File head, pushed once before probing.
    HeaderProbe,
    /// Sequential stream body.
    SequentialStream,
    /// File tail, pushed out of band.
    TailProbe,
}

impl DataKind {
    /// Decode the numeric wire tag (0 = head, 1 = stream, 100 = tail).
    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(DataKind::HeaderProbe),
            1 => Some(DataKind::SequentialStream),
            100 => Some(DataKind::TailProbe),
            _ => None,
        }
    }

    pub fn wire(self) -> i32 {
        match self {
            DataKind::HeaderProbe => 0,
            DataKind::SequentialStream => 1,
            DataKind::TailProbe => 100,
        }
    }
}

/// Playback authorization, checked before any ciphertext is accepted.
pub trait AuthState {
    fn is_authorized(&self) -> bool;
}

/// Authorization stub for plaintext-only hosts.
pub struct AlwaysAuthorized;

impl AuthState for AlwaysAuthorized {
    fn is_authorized(&self) -> bool {
        true
    }
}

impl SessionCore {
    /// Route one pushed buffer. Returns the number of bytes retained.
    pub(crate) fn ingest(
        &mut self,
        offset: u64,
        bytes: &[u8],
        kind: DataKind,
        auth: &dyn AuthState,
        ctrl: &mut dyn DownloaderControl,
    ) -> SessionResult<usize> {
        trace!(offset, len = bytes.len(), ?kind, "ingest");
        match kind {
            DataKind::HeaderProbe => self.ingest_head(offset, bytes, ctrl),
            DataKind::SequentialStream => self.ingest_stream(offset, bytes, auth, ctrl),
            DataKind::TailProbe => self.ingest_tail(offset, bytes),
        }
    }

    /// Head data: detect the encryption prologue, eagerly decrypt the
    /// aligned payload prefix, park the unaligned remainder for the first
    /// stream continuation, and cache the whole (decrypted) head as the
    /// probe region.
    fn ingest_head(
        &mut self,
        offset: u64,
        bytes: &[u8],
        ctrl: &mut dyn DownloaderControl,
    ) -> SessionResult<usize> {
        let prologue = if self.decryption_enabled && bytes.len() >= PROLOGUE_SIZE {
            parse_prologue(bytes).map_err(|e| SessionError::InvalidData(e.to_string()))?
        } else {
            None
        };

        let retained = match prologue {
            Some(info) if info.encrypted => {
                let mut cipher = Aes128ChunkCipher::new(info.key, info.iv);
                let mut body = bytes[PROLOGUE_SIZE..].to_vec();
                let aligned = body.len() - body.len() % CHUNK_SIZE;
                if aligned > 0 {
                    cipher.seek_chunk(0);
                    cipher
                        .decrypt(&mut body[..aligned])
                        .map_err(|e| SessionError::InvalidData(e.to_string()))?;
                    self.ring.append(&body[..aligned])?;
                }
                // Remainder below the chunk boundary stays encrypted until the
                // live stream continues it.
                if aligned < body.len() {
                    self.aligner
                        .park(&body[aligned..], (aligned / CHUNK_SIZE) as u64);
                }
                debug!(
                    aligned,
                    remainder = body.len() - aligned,
                    "encrypted head ingested"
                );
                let len = body.len();
                self.edges.set_region(EdgeTag::Head, offset, body);
                self.cipher = Some(Box::new(cipher));
                len
            }
            _ => {
                self.edges.set_region(EdgeTag::Head, offset, bytes.to_vec());
                self.ring.append(bytes)?;
                bytes.len()
            }
        };

        self.pos.note_write(offset, bytes.len() as u64);
        self.end_of_stream = self.pos.reaches_end(offset, bytes.len() as u64);
        self.flow.on_occupancy(self.ring.used(), ctrl);
        Ok(retained)
    }

    /// Stream data: discontinuity detection, chunk alignment, decryption,
    /// FIFO append, flow control.
    fn ingest_stream(
        &mut self,
        offset: u64,
        bytes: &[u8],
        auth: &dyn AuthState,
        ctrl: &mut dyn DownloaderControl,
    ) -> SessionResult<usize> {
        if self.probe_done && !self.pos.is_contiguous(offset) {
            warn!(
                offset,
                expected = self.pos.expected_next(),
                "stream discontinuity, dropping buffered bytes"
            );
            self.reset_sequential();
        }

        if let Some(cipher) = self.cipher.as_mut() {
            // Authorization is checked before any byte is absorbed, so a
            // denial leaves the buffers untouched.
            if !auth.is_authorized() {
                return Err(SessionError::AuthorizationFailed);
            }
            // Secure FIFO space before the aligner consumes the push: a
            // growth failure must reject the push with the aligner residual
            // intact, or a retry would double-feed these bytes.
            let pending = self.aligner.residual_len() + bytes.len();
            let flush_len = pending - pending % CHUNK_SIZE;
            if flush_len > 0 {
                self.ring.reserve(flush_len)?;
            }
            if let Some(mut flush) = self.aligner.absorb(offset, bytes) {
                cipher.seek_chunk(flush.chunk_index);
                cipher
                    .decrypt(&mut flush.bytes)
                    .map_err(|e| SessionError::InvalidData(e.to_string()))?;
                self.ring.append(&flush.bytes)?;
            }
        } else {
            self.ring.append(bytes)?;
        }

        self.pos.note_write(offset, bytes.len() as u64);
        self.end_of_stream = self.pos.reaches_end(offset, bytes.len() as u64);
        self.flow.on_occupancy(self.ring.used(), ctrl);
        Ok(bytes.len())
    }

    /// Tail data: decrypt in place where possible and cache as the tail
    /// probe region. Never touches the FIFO or the sequential cursor.
    fn ingest_tail(&mut self, offset: u64, bytes: &[u8]) -> SessionResult<usize> {
        let mut data = bytes.to_vec();
        if let Some(cipher) = self.cipher.as_mut() {
            let aligned = data.len() - data.len() % CHUNK_SIZE;
            if aligned > 0 {
                cipher.seek_chunk(chunk_index_for(offset));
                if let Err(e) = cipher.decrypt(&mut data[..aligned]) {
                    // Index data is best-effort; a bad tail only degrades
                    // seeking, it must not kill the session.
                    warn!(error = %e, offset, "tail decrypt failed, caching raw bytes");
                    data.copy_from_slice(bytes);
                }
            }
        }
        let len = data.len();
        self.edges.set_region(EdgeTag::Tail, offset, data);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::head(0, Some(DataKind::HeaderProbe))]
    #[case::stream(1, Some(DataKind::SequentialStream))]
    #[case::tail(100, Some(DataKind::TailProbe))]
    #[case::unknown(2, None)]
    #[case::negative(-1, None)]
    fn test_wire_roundtrip(#[case] wire: i32, #[case] expected: Option<DataKind>) {
        let kind = DataKind::from_wire(wire);
        assert_eq!(kind, expected);
        if let Some(kind) = kind {
            assert_eq!(kind.wire(), wire);
        }
    }
}
