//! Music bundle prologue.
//!
//! A bundle stream packs lyrics and media into one file:
//!
//! ```text
//! 0          48-byte magic header ("SLUICE_MUSIC v1.0", NUL padded)
//! 48         3 x 40-byte file table entries (name[32], len u32, offset u32, LE)
//! 168        lyrics (length = entry 0)
//! 168+lyrics media payload
//! ```
//!
//! The prologue is consumed through the probe-phase [`StreamIo`] before the
//! container probe, so the engine never sees it. Size queries for bundle
//! streams report half the remaining payload (the payload interleaves two
//! renditions of equal length).

use tracing::{debug, info};

use crate::engine::{ReadOutcome, StreamIo};
use crate::error::{SessionError, SessionResult};

/// Magic string at the start of a bundle header.
pub const BUNDLE_MAGIC: &[u8] = b"SLUICE_MUSIC v1.0";

const HEAD_SIZE: usize = 48;
const ENTRY_NAME_SIZE: usize = 32;
const ENTRY_SIZE: usize = ENTRY_NAME_SIZE + 4 + 4;
const ENTRY_COUNT: usize = 3;

/// One file table entry.
#[derive(Clone, Debug)]
pub struct BundleEntry {
    pub name: String,
    pub len: u32,
    pub offset: u32,
}

/// Parsed bundle prologue.
#[derive(Clone, Debug)]
pub struct BundleInfo {
    pub entries: Vec<BundleEntry>,
    pub lyrics: Vec<u8>,
    /// Absolute offset of the media payload.
    pub start_offset: u64,
}

/// Read and parse the bundle prologue from the probe stream.
pub(crate) fn read_bundle_prologue(io: &mut dyn StreamIo) -> SessionResult<BundleInfo> {
    let mut head = [0u8; HEAD_SIZE];
    read_exact(io, &mut head)?;
    if !head.starts_with(BUNDLE_MAGIC) {
        return Err(SessionError::InvalidData(
            "bundle magic header missing".into(),
        ));
    }

    let mut table = [0u8; ENTRY_COUNT * ENTRY_SIZE];
    read_exact(io, &mut table)?;
    let entries: Vec<BundleEntry> = table
        .chunks_exact(ENTRY_SIZE)
        .map(parse_entry)
        .collect::<SessionResult<_>>()?;
    for entry in &entries {
        debug!(name = %entry.name, len = entry.len, offset = entry.offset, "bundle entry");
    }

    let mut lyrics = vec![0u8; entries[0].len as usize];
    read_exact(io, &mut lyrics)?;

    let start_offset = (HEAD_SIZE + table.len() + lyrics.len()) as u64;
    info!(start_offset, "bundle prologue parsed");
    Ok(BundleInfo {
        entries,
        lyrics,
        start_offset,
    })
}

fn parse_entry(raw: &[u8]) -> SessionResult<BundleEntry> {
    let name_end = raw[..ENTRY_NAME_SIZE]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(ENTRY_NAME_SIZE);
    let name = String::from_utf8(raw[..name_end].to_vec())
        .map_err(|_| SessionError::InvalidData("bundle entry name is not utf-8".into()))?;
    let len = u32::from_le_bytes([raw[32], raw[33], raw[34], raw[35]]);
    let offset = u32::from_le_bytes([raw[36], raw[37], raw[38], raw[39]]);
    Ok(BundleEntry { name, len, offset })
}

/// The prologue must be fully present in the head region; a short read is a
/// malformed bundle, not a retry condition.
fn read_exact(io: &mut dyn StreamIo, out: &mut [u8]) -> SessionResult<()> {
    let mut filled = 0;
    while filled < out.len() {
        match io.read(&mut out[filled..]) {
            ReadOutcome::Filled(n) if n > 0 => filled += n,
            _ => {
                return Err(SessionError::InvalidData(format!(
                    "truncated bundle prologue: {filled} of {} bytes",
                    out.len()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SliceIo<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl StreamIo for SliceIo<'_> {
        fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
            let n = buf.len().min(self.data.len() - self.pos);
            if n == 0 {
                return ReadOutcome::Eof;
            }
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            ReadOutcome::Filled(n)
        }

        fn seek(&mut self, _offset: i64, _whence: crate::Whence) -> Result<u64, SessionError> {
            Err(SessionError::InvalidParam)
        }
    }

    pub(crate) fn make_bundle_prologue(lyrics: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; HEAD_SIZE];
        buf[..BUNDLE_MAGIC.len()].copy_from_slice(BUNDLE_MAGIC);

        let names: [&[u8]; 3] = [b"lyrics.lrc", b"cover.jpg", b"audio.bin"];
        let mut offset = (HEAD_SIZE + ENTRY_COUNT * ENTRY_SIZE) as u32;
        for (i, name) in names.iter().enumerate() {
            let mut entry = [0u8; ENTRY_SIZE];
            entry[..name.len()].copy_from_slice(name);
            let len = if i == 0 { lyrics.len() as u32 } else { 0 };
            entry[32..36].copy_from_slice(&len.to_le_bytes());
            entry[36..40].copy_from_slice(&offset.to_le_bytes());
            offset += len;
            buf.extend_from_slice(&entry);
        }
        buf.extend_from_slice(lyrics);
        buf
    }

    #[test]
    fn test_parse_bundle_prologue() {
        let lyrics = b"[00:01.00] first line\n[00:04.20] second line\n";
        let data = make_bundle_prologue(lyrics);
        let mut io = SliceIo {
            data: &data,
            pos: 0,
        };

        let info = read_bundle_prologue(&mut io).unwrap();
        assert_eq!(info.entries.len(), 3);
        assert_eq!(info.entries[0].name, "lyrics.lrc");
        assert_eq!(info.entries[0].len as usize, lyrics.len());
        assert_eq!(info.lyrics, lyrics);
        assert_eq!(info.start_offset, data.len() as u64);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut data = make_bundle_prologue(b"x");
        data[0] = b'Z';
        let mut io = SliceIo {
            data: &data,
            pos: 0,
        };
        assert!(matches!(
            read_bundle_prologue(&mut io),
            Err(SessionError::InvalidData(_))
        ));
    }

    #[test]
    fn test_truncated_prologue_rejected() {
        let data = make_bundle_prologue(b"some lyrics");
        let mut io = SliceIo {
            data: &data[..60],
            pos: 0,
        };
        let err = read_bundle_prologue(&mut io).unwrap_err();
        assert_eq!(err.code(), 3);
    }
}
