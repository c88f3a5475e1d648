//! `sluice-crypto`
//!
//! Chunk-aligned decryption support for the ingest path.
//!
//! The stream cipher only operates on whole 8 KiB chunks starting at a
//! chunk boundary, preceded by a fixed 512-byte prologue that is excluded
//! from chunk counting. [`ChunkAligner`] accumulates arbitrary-sized writes
//! into cipher-sized flushes; [`ChunkCipher`] is the capability interface
//! the ingest path drives; [`Aes128ChunkCipher`] is the concrete cipher.

#![forbid(unsafe_code)]

mod aes_cipher;
mod aligner;
mod cipher;
mod error;
mod prologue;

pub use aes_cipher::Aes128ChunkCipher;
pub use aligner::{AlignedFlush, CHUNK_SIZE, ChunkAligner, PROLOGUE_SIZE, chunk_index_for};
pub use cipher::ChunkCipher;
pub use error::CryptoError;
pub use prologue::{PROLOGUE_MAGIC, PrologueInfo, parse_prologue};
