//! AES-128-CBC chunk cipher.
//!
//! Each 8 KiB chunk is an independent CBC unit: the IV is derived from the
//! base IV and the chunk index, so any chunk can be decrypted without the
//! preceding ciphertext. That is what makes resuming after a seek or a
//! discontinuity cheap — the ingest path just reseeds the chunk cursor.

use aes::Aes128;
use cbc::{
    Decryptor, Encryptor,
    cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::NoPadding},
};
use tracing::trace;

use crate::{CHUNK_SIZE, ChunkCipher, CryptoError};

/// AES block size in bytes.
const AES_BLOCK_SIZE: usize = 16;

/// Concrete chunk cipher over AES-128-CBC.
pub struct Aes128ChunkCipher {
    key: [u8; 16],
    base_iv: [u8; 16],
    chunk_index: u64,
}

impl Aes128ChunkCipher {
    pub fn new(key: [u8; 16], base_iv: [u8; 16]) -> Self {
        Self {
            key,
            base_iv,
            chunk_index: 0,
        }
    }

    /// Per-chunk IV: base IV with the chunk index folded into the tail.
    fn chunk_iv(&self, index: u64) -> [u8; 16] {
        let mut iv = self.base_iv;
        for (dst, src) in iv[8..].iter_mut().zip(index.to_be_bytes()) {
            *dst ^= src;
        }
        iv
    }

    /// Inverse transform, used by packaging tools and test fixtures. Follows
    /// the same chunk cursor rules as [`ChunkCipher::decrypt`].
    pub fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if !buf.len().is_multiple_of(CHUNK_SIZE) {
            return Err(CryptoError::UnalignedBuffer {
                len: buf.len(),
                chunk_size: CHUNK_SIZE,
            });
        }
        for chunk in buf.chunks_exact_mut(CHUNK_SIZE) {
            let iv = self.chunk_iv(self.chunk_index);
            let encryptor = Encryptor::<Aes128>::new((&self.key).into(), (&iv).into());
            encryptor
                .encrypt_padded_mut::<NoPadding>(chunk, CHUNK_SIZE)
                .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;
            self.chunk_index += 1;
        }
        Ok(())
    }

    fn decrypt_chunk(&self, chunk: &mut [u8], index: u64) -> Result<(), CryptoError> {
        debug_assert_eq!(chunk.len(), CHUNK_SIZE);
        debug_assert!(CHUNK_SIZE.is_multiple_of(AES_BLOCK_SIZE));
        let iv = self.chunk_iv(index);
        let decryptor = Decryptor::<Aes128>::new((&self.key).into(), (&iv).into());
        decryptor
            .decrypt_padded_mut::<NoPadding>(chunk)
            .map_err(|e| CryptoError::DecryptFailed(e.to_string()))?;
        Ok(())
    }
}

impl ChunkCipher for Aes128ChunkCipher {
    fn seek_chunk(&mut self, index: u64) {
        self.chunk_index = index;
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        if !buf.len().is_multiple_of(CHUNK_SIZE) {
            return Err(CryptoError::UnalignedBuffer {
                len: buf.len(),
                chunk_size: CHUNK_SIZE,
            });
        }
        for chunk in buf.chunks_exact_mut(CHUNK_SIZE) {
            self.decrypt_chunk(chunk, self.chunk_index)?;
            self.chunk_index += 1;
        }
        trace!(next_chunk = self.chunk_index, "chunks decrypted");
        Ok(())
    }
}
