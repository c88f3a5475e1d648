//! Growable byte FIFO.
//!
//! Holds decrypted, decoder-ready stream bytes between the ingest path and
//! the pull adapter. Capacity only grows during a session; a reset clears
//! occupancy without giving memory back.

use std::collections::VecDeque;

use tracing::debug;

use crate::BufferError;

/// Default FIFO capacity (20 MiB).
pub const DEFAULT_FIFO_CAPACITY: usize = 20 * 1024 * 1024;

/// Extra headroom allocated on top of the shortfall when growing (512 KiB).
pub const GROW_STEP: usize = 512 * 1024;

/// Variable-capacity byte queue.
///
/// # Invariants
/// - `used() <= capacity()` at all times
/// - capacity only grows, never shrinks
/// - `reset()` clears occupancy, capacity unchanged
pub struct RingBuffer {
    buf: VecDeque<u8>,
    capacity: usize,
}

impl RingBuffer {
    /// Create a FIFO with the given initial capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes currently buffered. O(1), side-effect free.
    pub fn used(&self) -> usize {
        self.buf.len()
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining space before the next growth.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Ensure space for `additional` more bytes, growing capacity by
    /// `shortfall + GROW_STEP` when remaining space is short. Lets callers
    /// secure space up front so a later [`append`](Self::append) of that
    /// size cannot fail mid-transaction.
    ///
    /// # Errors
    ///
    /// [`BufferError::FifoFull`] if the growth allocation itself fails.
    /// Buffered bytes are never dropped.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        if self.remaining() >= additional {
            return Ok(());
        }
        let grow = additional - self.remaining() + GROW_STEP;
        let new_capacity = self.capacity + grow;
        self.buf
            .try_reserve(new_capacity - self.buf.len())
            .map_err(|_| BufferError::FifoFull { requested: grow })?;
        self.capacity = new_capacity;
        debug!(grow, capacity = self.capacity, "fifo grown");
        Ok(())
    }

    /// Append bytes, growing capacity as in [`reserve`](Self::reserve).
    ///
    /// # Errors
    ///
    /// [`BufferError::FifoFull`] if the growth allocation itself fails.
    /// Previously buffered bytes are never dropped.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize, BufferError> {
        self.reserve(bytes.len())?;
        self.buf.extend(bytes.iter().copied());
        Ok(bytes.len())
    }

    /// Drain up to `max_len` bytes in FIFO order. Returns immediately with
    /// whatever is available; never blocks.
    pub fn drain(&mut self, max_len: usize) -> Vec<u8> {
        let n = max_len.min(self.buf.len());
        self.buf.drain(..n).collect()
    }

    /// Drain into a caller-provided buffer, returning bytes written.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.buf.len());
        for (dst, src) in out.iter_mut().zip(self.buf.drain(..n)) {
            *dst = src;
        }
        n
    }

    /// Discard all buffered bytes. Capacity is unchanged.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_FIFO_CAPACITY)
    }
}
