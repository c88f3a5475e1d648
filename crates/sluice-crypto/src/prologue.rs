//! Encryption prologue parsing.
//!
//! Encrypted streams carry a fixed 512-byte prologue ahead of chunk 0:
//!
//! ```text
//! offset  size  field
//! 0       8     magic "SLUICEv1"
//! 8       1     encryption flag (non-zero = encrypted)
//! 16      16    AES-128 key
//! 32      16    base IV
//! 48..512       reserved
//! ```
//!
//! A head buffer without the magic is a plaintext stream; that is not an
//! error, ingest just skips the cipher path.

use crate::{CryptoError, PROLOGUE_SIZE};

/// Magic bytes at the start of the prologue.
pub const PROLOGUE_MAGIC: &[u8; 8] = b"SLUICEv1";

/// Parsed prologue contents.
#[derive(Clone, Debug)]
pub struct PrologueInfo {
    pub encrypted: bool,
    pub key: [u8; 16],
    pub iv: [u8; 16],
}

/// Parse the first [`PROLOGUE_SIZE`] bytes of a head buffer.
///
/// Returns `Ok(None)` when the magic is absent (plaintext stream).
///
/// # Errors
///
/// [`CryptoError::ShortPrologue`] if fewer than [`PROLOGUE_SIZE`] bytes are
/// supplied.
pub fn parse_prologue(buf: &[u8]) -> Result<Option<PrologueInfo>, CryptoError> {
    if buf.len() < PROLOGUE_SIZE {
        return Err(CryptoError::ShortPrologue {
            len: buf.len(),
            expected: PROLOGUE_SIZE,
        });
    }
    if &buf[..8] != PROLOGUE_MAGIC {
        return Ok(None);
    }

    let mut key = [0u8; 16];
    key.copy_from_slice(&buf[16..32]);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&buf[32..48]);

    Ok(Some(PrologueInfo {
        encrypted: buf[8] != 0,
        key,
        iv,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn make_prologue(encrypted: bool, key: [u8; 16], iv: [u8; 16]) -> Vec<u8> {
        let mut buf = vec![0u8; PROLOGUE_SIZE];
        buf[..8].copy_from_slice(PROLOGUE_MAGIC);
        buf[8] = u8::from(encrypted);
        buf[16..32].copy_from_slice(&key);
        buf[32..48].copy_from_slice(&iv);
        buf
    }

    #[test]
    fn test_parse_encrypted_prologue() {
        let buf = make_prologue(true, [0xaa; 16], [0xbb; 16]);
        let info = parse_prologue(&buf).unwrap().unwrap();
        assert!(info.encrypted);
        assert_eq!(info.key, [0xaa; 16]);
        assert_eq!(info.iv, [0xbb; 16]);
    }

    #[test]
    fn test_missing_magic_is_plaintext() {
        let buf = vec![0u8; PROLOGUE_SIZE];
        assert!(parse_prologue(&buf).unwrap().is_none());
    }

    #[test]
    fn test_short_buffer_fails() {
        let buf = vec![0u8; 48];
        assert!(matches!(
            parse_prologue(&buf),
            Err(CryptoError::ShortPrologue { len: 48, .. })
        ));
    }

    #[test]
    fn test_unencrypted_flag() {
        let buf = make_prologue(false, [1; 16], [2; 16]);
        let info = parse_prologue(&buf).unwrap().unwrap();
        assert!(!info.encrypted);
    }
}
