//! `sluice-session`
//!
//! The buffered I/O and flow-control core that bridges a push-based,
//! out-of-order network data source to a pull-based demuxer/decoder.
//!
//! ## Data flow
//!
//! ```text
//! network push -> ingest -> [aligner -> cipher] -> ring buffer / edge regions
//!                                                        |
//!                              pull adapter  <- demux engine pull
//! ```
//!
//! A [`StreamSession`] owns all buffering state exclusively; scheduling is
//! single-threaded cooperative, so no operation blocks — the pull adapter
//! answers [`ReadOutcome::WouldBlock`] / [`ReadOutcome::Eof`] instead of
//! waiting, and backpressure is advisory (`Pause`/`Resume` signals through
//! `sluice_buffer::DownloaderControl`).

#![forbid(unsafe_code)]

mod adapter;
mod bundle;
mod engine;
mod error;
mod ingest;
mod policy;
mod position;
mod session;
mod sink;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use bundle::{BUNDLE_MAGIC, BundleEntry, BundleInfo};
pub use engine::{
    AudioFrame, DecodedFrame, DemuxEngine, EngineError, EngineResult, EnginePacket, MediaInfo,
    ReadOutcome, StreamIo, TrackInfo, TrackKind, VideoFrame, Whence,
};
pub use error::{SessionError, SessionResult};
pub use ingest::{AlwaysAuthorized, AuthState, DataKind};
pub use policy::TrackPolicy;
pub use position::StreamPosition;
pub use session::{
    MIN_DECODE_BACKLOG, MediaKind, SessionConfig, SessionState, StepOutcome, StreamSession,
};
pub use sink::{FrameSink, PacketOut};
