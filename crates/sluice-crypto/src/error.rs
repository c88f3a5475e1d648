use thiserror::Error;

/// Errors produced by `sluice-crypto`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("buffer length {len} is not a multiple of the chunk size {chunk_size}")]
    UnalignedBuffer { len: usize, chunk_size: usize },

    #[error("decrypt failed: {0}")]
    DecryptFailed(String),

    #[error("prologue too short: {len} < {expected}")]
    ShortPrologue { len: usize, expected: usize },
}
