//! The pull side of the bridge.
//!
//! A short-lived view over [`SessionCore`] implementing [`StreamIo`] for the
//! engine. Behavior depends on the session phase:
//!
//! - probing: reads are positioned and served exclusively from the edge
//!   regions; a miss is [`ReadOutcome::Eof`] (the engine falls back to
//!   what it has). Seeks are virtual and cheap.
//! - streaming: reads drain the FIFO sequentially; an empty FIFO is
//!   [`ReadOutcome::Eof`] once the stream completed, a tail-region hit
//!   otherwise, and [`ReadOutcome::WouldBlock`] as the last resort. Seeks
//!   are rejected — repositioning mid-stream is the host's job, via
//!   [`crate::StreamSession::seek_to`].

use sluice_buffer::DownloaderControl;
use tracing::trace;

use crate::engine::{ReadOutcome, StreamIo, Whence};
use crate::error::SessionError;
use crate::state::SessionCore;

pub(crate) struct PullAdapter<'a> {
    core: &'a mut SessionCore,
    ctrl: &'a mut dyn DownloaderControl,
}

impl<'a> PullAdapter<'a> {
    pub(crate) fn new(core: &'a mut SessionCore, ctrl: &'a mut dyn DownloaderControl) -> Self {
        Self { core, ctrl }
    }

    fn read_probing(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let pos = self.core.pos.effective_read_pos();
        let n = self.core.edges.read_at(pos, buf);
        if n > 0 {
            self.core.pos.commit_read(pos + n as u64);
            ReadOutcome::Filled(n)
        } else {
            trace!(pos, "probe read outside edge regions");
            ReadOutcome::Eof
        }
    }

    fn read_streaming(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let used = self.core.ring.used();
        self.core.flow.on_occupancy(used, self.ctrl);

        if used == 0 {
            if self.core.end_of_stream {
                return ReadOutcome::Eof;
            }
            // The edge regions still answer positioned reads that raced
            // ahead of the sequential stream (index lookups near the tail).
            let pos = self.core.pos.effective_read_pos();
            let n = self.core.edges.read_at(pos, buf);
            if n > 0 {
                self.core.pos.commit_read(pos + n as u64);
                return ReadOutcome::Filled(n);
            }
            return ReadOutcome::WouldBlock;
        }

        let n = self.core.ring.drain_into(buf);
        self.core.pos.advance_read(n as u64);
        ReadOutcome::Filled(n)
    }
}

impl StreamIo for PullAdapter<'_> {
    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        if buf.is_empty() {
            return ReadOutcome::Filled(0);
        }
        if self.core.probe_done {
            self.read_streaming(buf)
        } else {
            self.read_probing(buf)
        }
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, SessionError> {
        if whence == Whence::Size {
            return Ok(self.core.reported_size().unwrap_or(0));
        }
        if self.core.probe_done {
            return Err(SessionError::InvalidState("seek after probe completion"));
        }

        let base = match whence {
            Whence::Start => 0i128,
            Whence::Current => self.core.pos.effective_read_pos() as i128,
            Whence::End => self
                .core
                .reported_size()
                .ok_or(SessionError::InvalidParam)? as i128,
            Whence::Size => unreachable!(),
        };
        let target = base + offset as i128;
        if target < 0 || target > u64::MAX as i128 {
            return Err(SessionError::InvalidParam);
        }
        self.core.pos.begin_virtual_seek(target as u64);
        Ok(target as u64)
    }
}
