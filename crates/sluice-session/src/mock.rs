//! Scriptable engine and sink doubles for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::engine::{
    AudioFrame, DecodedFrame, DemuxEngine, EngineError, EngineResult, EnginePacket, MediaInfo,
    ReadOutcome, StreamIo, TrackInfo, TrackKind, VideoFrame, Whence,
};
use crate::sink::{FrameSink, PacketOut};

/// Media with one video track (id 0) and two audio tracks (ids 1, 2).
pub fn dual_audio_media() -> MediaInfo {
    MediaInfo {
        duration_ms: 60_000,
        tracks: vec![
            TrackInfo {
                id: 0,
                kind: TrackKind::Video,
                codec: "h264".into(),
                width: 320,
                height: 240,
                sample_rate: 0,
                channels: 0,
            },
            TrackInfo {
                id: 1,
                kind: TrackKind::Audio,
                codec: "aac".into(),
                width: 0,
                height: 0,
                sample_rate: 44_100,
                channels: 2,
            },
            TrackInfo {
                id: 2,
                kind: TrackKind::Audio,
                codec: "aac".into(),
                width: 0,
                height: 0,
                sample_rate: 44_100,
                channels: 2,
            },
        ],
    }
}

/// Shorthand for building scripted packets.
pub fn packet(track: u32, pts: i64, keyframe: bool) -> EnginePacket {
    EnginePacket {
        track,
        data: Bytes::from_static(b"payload"),
        pts,
        dts: pts,
        keyframe,
    }
}

/// Scripted [`DemuxEngine`].
///
/// During probe it pulls from the session until EOF, recording every byte;
/// in steady state it hands out scripted packets, optionally draining a
/// fixed number of stream bytes per packet to emulate demuxing.
pub struct MockEngine {
    media: MediaInfo,
    packets: VecDeque<EnginePacket>,
    bytes_per_packet: usize,
    probe_size_query: bool,
    probe_bytes: Arc<Mutex<Vec<u8>>>,
    stream_bytes: Arc<Mutex<Vec<u8>>>,
    reported_size: Arc<Mutex<Option<u64>>>,
    closed: Arc<AtomicBool>,
}

impl MockEngine {
    pub fn new(media: MediaInfo) -> Self {
        Self {
            media,
            packets: VecDeque::new(),
            bytes_per_packet: 0,
            probe_size_query: false,
            probe_bytes: Arc::default(),
            stream_bytes: Arc::default(),
            reported_size: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn with_packets(mut self, packets: Vec<EnginePacket>) -> Self {
        self.packets = packets.into();
        self
    }

    /// Drain this many stream bytes before producing each packet.
    pub fn with_bytes_per_packet(mut self, n: usize) -> Self {
        self.bytes_per_packet = n;
        self
    }

    /// Issue a `Whence::Size` query during probe.
    pub fn with_probe_size_query(mut self) -> Self {
        self.probe_size_query = true;
        self
    }

    /// Everything read during probe.
    pub fn probe_bytes(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.probe_bytes)
    }

    /// Everything drained from the sequential stream.
    pub fn stream_bytes(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.stream_bytes)
    }

    /// Size reported by the probe-time `Whence::Size` query.
    pub fn reported_size(&self) -> Arc<Mutex<Option<u64>>> {
        Arc::clone(&self.reported_size)
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn log(sink: &Arc<Mutex<Vec<u8>>>, bytes: &[u8]) {
        if let Ok(mut log) = sink.lock() {
            log.extend_from_slice(bytes);
        }
    }
}

impl DemuxEngine for MockEngine {
    fn probe(&mut self, io: &mut dyn StreamIo) -> EngineResult<MediaInfo> {
        if self.probe_size_query {
            let size = io
                .seek(0, Whence::Size)
                .map_err(|e| EngineError::Other(e.to_string()))?;
            if let Ok(mut slot) = self.reported_size.lock() {
                *slot = Some(size);
            }
        }
        let mut buf = [0u8; 64];
        loop {
            match io.read(&mut buf) {
                ReadOutcome::Filled(n) if n > 0 => Self::log(&self.probe_bytes, &buf[..n]),
                ReadOutcome::Filled(_) | ReadOutcome::Eof => break,
                ReadOutcome::WouldBlock => return Err(EngineError::WouldBlock),
            }
        }
        if self.probe_bytes.lock().map_or(true, |log| log.is_empty()) {
            return Err(EngineError::Malformed("no probe data".into()));
        }
        Ok(self.media.clone())
    }

    fn next_packet(&mut self, io: &mut dyn StreamIo) -> EngineResult<EnginePacket> {
        if self.bytes_per_packet > 0 {
            let mut buf = vec![0u8; self.bytes_per_packet];
            match io.read(&mut buf) {
                ReadOutcome::Filled(n) => Self::log(&self.stream_bytes, &buf[..n]),
                ReadOutcome::Eof => {
                    if self.packets.is_empty() {
                        return Err(EngineError::Eof);
                    }
                }
                ReadOutcome::WouldBlock => return Err(EngineError::WouldBlock),
            }
        }
        self.packets.pop_front().ok_or(EngineError::Eof)
    }

    fn decode(&mut self, packet: &EnginePacket) -> EngineResult<Vec<DecodedFrame>> {
        let timestamp = packet.pts as f64 / 1000.0;
        let frame = match self.media.track(packet.track).map(|t| t.kind) {
            Some(TrackKind::Video) => DecodedFrame::Video(VideoFrame {
                pixels: packet.data.clone(),
                width: 320,
                height: 240,
                keyframe: packet.keyframe,
                timestamp,
            }),
            Some(TrackKind::Audio) => DecodedFrame::Audio(AudioFrame {
                track: packet.track,
                pcm: packet.data.clone(),
                sample_rate: 44_100,
                channels: 2,
                timestamp,
            }),
            None => return Err(EngineError::Malformed("unknown track".into())),
        };
        Ok(vec![frame])
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sink that records everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub video: Vec<VideoFrame>,
    pub audio: Vec<AudioFrame>,
    pub packets: Vec<(TrackKind, i64, bool)>,
}

impl FrameSink for RecordingSink {
    fn on_video_frame(&mut self, frame: &VideoFrame) {
        self.video.push(frame.clone());
    }

    fn on_audio_frame(&mut self, frame: &AudioFrame) {
        self.audio.push(frame.clone());
    }

    fn on_packet(&mut self, packet: &PacketOut<'_>) {
        self.packets.push((packet.kind, packet.pts, packet.keyframe));
    }
}

/// Downloader control that records signals.
#[derive(Default)]
pub struct RecordingCtrl {
    signals: Arc<Mutex<Vec<sluice_buffer::FlowSignal>>>,
}

impl RecordingCtrl {
    pub fn signals(&self) -> Arc<Mutex<Vec<sluice_buffer::FlowSignal>>> {
        Arc::clone(&self.signals)
    }
}

impl sluice_buffer::DownloaderControl for RecordingCtrl {
    fn control(&mut self, signal: sluice_buffer::FlowSignal) {
        if let Ok(mut log) = self.signals.lock() {
            log.push(signal);
        }
    }
}

/// Authorization toggle shared with the test body.
#[derive(Clone, Default)]
pub struct SharedAuth {
    authorized: Arc<AtomicBool>,
}

impl SharedAuth {
    pub fn new(authorized: bool) -> Self {
        let auth = Self::default();
        auth.set(authorized);
        auth
    }

    pub fn set(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }
}

impl crate::AuthState for SharedAuth {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }
}
