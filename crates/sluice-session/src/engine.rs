//! Capability traits at the demuxer/decoder seam.
//!
//! The session does not link a demuxer; it owns the buffered I/O and hands
//! the engine a [`StreamIo`] to pull from. Anything that can probe a
//! container, produce packets and decode them can sit behind
//! [`DemuxEngine`].

use bytes::Bytes;
use thiserror::Error;

/// Seek origin for [`StreamIo::seek`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
    /// Not a seek: query the total stream size without moving the cursor.
    Size,
}

/// Outcome of a non-blocking read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `buf[..n]` was filled. `Filled(0)` is only returned for empty `buf`.
    Filled(usize),
    /// The stream ended; no further bytes will arrive at this position.
    Eof,
    /// No bytes buffered right now; retry after more data is ingested.
    WouldBlock,
}

/// Non-blocking byte source handed to the engine.
pub trait StreamIo {
    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome;

    /// Reposition the stream, or query its size with [`Whence::Size`].
    /// Returns the new absolute position (or the size).
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, crate::SessionError>;
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("end of stream")]
    Eof,

    #[error("not enough buffered data")]
    WouldBlock,

    #[error("malformed stream: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

#[derive(Clone, Debug)]
pub struct TrackInfo {
    pub id: u32,
    pub kind: TrackKind,
    pub codec: String,
    /// Video only.
    pub width: u32,
    pub height: u32,
    /// Audio only.
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Clone, Debug, Default)]
pub struct MediaInfo {
    pub duration_ms: u64,
    pub tracks: Vec<TrackInfo>,
}

impl MediaInfo {
    pub fn track(&self, id: u32) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// A demuxed, still-encoded packet.
#[derive(Clone, Debug)]
pub struct EnginePacket {
    pub track: u32,
    pub data: Bytes,
    /// Milliseconds.
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
}

#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
    pub keyframe: bool,
    /// Seconds.
    pub timestamp: f64,
}

#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub track: u32,
    pub pcm: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    /// Seconds.
    pub timestamp: f64,
}

#[derive(Clone, Debug)]
pub enum DecodedFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

/// Demuxer/decoder capability.
///
/// All methods are non-blocking: when the underlying [`StreamIo`] answers
/// [`ReadOutcome::WouldBlock`], the engine surfaces
/// [`EngineError::WouldBlock`] and is called again after more data arrives.
pub trait DemuxEngine {
    /// Identify the container and its tracks. Called once, while the session
    /// is still in the probe phase; `io` serves the head/tail edge regions.
    fn probe(&mut self, io: &mut dyn StreamIo) -> EngineResult<MediaInfo>;

    /// Demux the next packet from the sequential stream.
    fn next_packet(&mut self, io: &mut dyn StreamIo) -> EngineResult<EnginePacket>;

    /// Decode one packet into zero or more frames.
    fn decode(&mut self, packet: &EnginePacket) -> EngineResult<Vec<DecodedFrame>>;

    /// Release decoder resources. Called exactly once on session close.
    fn close(&mut self);
}
