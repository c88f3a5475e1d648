use sluice_buffer::{EdgeBufferStore, FlowController, RingBuffer};
use sluice_crypto::{ChunkAligner, ChunkCipher};

use crate::position::StreamPosition;

/// Mutable buffering state shared by the ingest path and the pull adapter.
///
/// Split out of [`crate::StreamSession`] so the adapter can borrow the
/// buffers while the session still holds the engine.
pub(crate) struct SessionCore {
    pub(crate) ring: RingBuffer,
    pub(crate) edges: EdgeBufferStore,
    pub(crate) aligner: ChunkAligner,
    pub(crate) cipher: Option<Box<dyn ChunkCipher>>,
    pub(crate) pos: StreamPosition,
    pub(crate) flow: FlowController,
    /// Set once probing succeeds; flips reads from edge regions to the ring.
    pub(crate) probe_done: bool,
    /// The sequential stream has reached the declared total size.
    pub(crate) end_of_stream: bool,
    /// Host opted in to decryption at session creation.
    pub(crate) decryption_enabled: bool,
    /// Overrides the declared size for size queries (bundle streams).
    pub(crate) virtual_size: Option<u64>,
}

impl SessionCore {
    pub(crate) fn new(
        fifo_capacity: usize,
        total_size: Option<u64>,
        decryption_enabled: bool,
    ) -> Self {
        Self {
            ring: RingBuffer::new(fifo_capacity),
            edges: EdgeBufferStore::new(),
            aligner: ChunkAligner::new(),
            cipher: None,
            pos: StreamPosition::new(total_size),
            flow: FlowController::new(),
            probe_done: false,
            end_of_stream: false,
            decryption_enabled,
            virtual_size: None,
        }
    }

    /// Size reported to the engine for [`crate::Whence::Size`] queries.
    pub(crate) fn reported_size(&self) -> Option<u64> {
        self.virtual_size.or_else(|| self.pos.total_size())
    }

    /// Drop all sequential buffering ahead of a re-download, keeping the
    /// edge regions and cipher keys.
    pub(crate) fn reset_sequential(&mut self) {
        self.ring.reset();
        self.aligner.reset();
        self.flow.reset();
        self.end_of_stream = false;
    }
}
