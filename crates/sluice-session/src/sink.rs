use crate::engine::{AudioFrame, TrackKind, VideoFrame};

/// A demuxed packet forwarded without decoding (passthrough mode).
#[derive(Debug)]
pub struct PacketOut<'a> {
    pub kind: TrackKind,
    pub data: &'a [u8],
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
}

/// Receiver for decoded frames and passthrough packets.
///
/// Implementations must not call back into the session; delivery happens
/// while the session is mid-step.
pub trait FrameSink {
    fn on_video_frame(&mut self, frame: &VideoFrame);

    fn on_audio_frame(&mut self, frame: &AudioFrame);

    /// Only invoked from the packet passthrough path.
    fn on_packet(&mut self, _packet: &PacketOut<'_>) {}
}
