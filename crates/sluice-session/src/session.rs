//! Session orchestration: state machine, decode stepping and seeking.

use sluice_buffer::{DEFAULT_FIFO_CAPACITY, DownloaderControl};
use tracing::{debug, info, instrument, trace, warn};

use crate::adapter::PullAdapter;
use crate::bundle::{BundleInfo, read_bundle_prologue};
use crate::engine::{DecodedFrame, DemuxEngine, EngineError, EnginePacket, MediaInfo};
use crate::error::{SessionError, SessionResult};
use crate::ingest::{AuthState, DataKind};
use crate::policy::TrackPolicy;
use crate::sink::{FrameSink, PacketOut};
use crate::state::SessionCore;

/// Decoding is held back until at least this much is buffered, unless the
/// stream already ended (512 KiB).
pub const MIN_DECODE_BACKLOG: usize = 512 * 1024;

/// Container family of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Plain transport stream.
    Transport,
    /// Music bundle with a lyrics prologue ahead of the payload.
    Bundle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting edge data; the engine has not finished probing.
    Probing,
    /// Normal sequential playback.
    Streaming,
    /// After [`StreamSession::seek_to`]: video is discarded until the next
    /// keyframe arrives.
    Seeking,
    Closed,
}

/// Result of one cooperative decode/demux step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A packet was consumed and its output delivered to the sink.
    Decoded,
    /// Not enough buffered data; step again after more ingest.
    Stalled,
    /// The stream is fully consumed.
    EndOfStream,
}

/// Session construction parameters.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Declared total stream size, when the host knows it.
    pub expected_size: Option<u64>,
    /// Enable prologue detection and chunk decryption.
    pub decryption_enabled: bool,
    /// Initial FIFO capacity.
    pub fifo_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expected_size: None,
            decryption_enabled: false,
            fifo_capacity: DEFAULT_FIFO_CAPACITY,
        }
    }
}

/// A push-to-pull streaming session.
///
/// Owns all buffering state; single-threaded, every method returns without
/// blocking. The host drives it from exactly one context: pushing data via
/// [`ingest`](Self::ingest) and pulling output via
/// [`decode_step`](Self::decode_step).
pub struct StreamSession {
    core: SessionCore,
    ctrl: Box<dyn DownloaderControl>,
    auth: Box<dyn AuthState>,
    engine: Option<Box<dyn DemuxEngine>>,
    state: SessionState,
    media: Option<MediaInfo>,
    policy: TrackPolicy,
    bundle: Option<BundleInfo>,
    /// Frames stamped earlier than this are dropped (accurate seek).
    begin_time: f64,
}

impl StreamSession {
    pub fn new(
        config: SessionConfig,
        ctrl: Box<dyn DownloaderControl>,
        auth: Box<dyn AuthState>,
    ) -> Self {
        info!(
            expected_size = config.expected_size,
            decryption = config.decryption_enabled,
            fifo_capacity = config.fifo_capacity,
            "session created"
        );
        Self {
            core: SessionCore::new(
                config.fifo_capacity,
                config.expected_size,
                config.decryption_enabled,
            ),
            ctrl,
            auth,
            engine: None,
            state: SessionState::Probing,
            media: None,
            policy: TrackPolicy::default(),
            bundle: None,
            begin_time: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn media(&self) -> Option<&MediaInfo> {
        self.media.as_ref()
    }

    pub fn bundle(&self) -> Option<&BundleInfo> {
        self.bundle.as_ref()
    }

    /// Bytes currently queued for the engine.
    pub fn buffered_bytes(&self) -> usize {
        self.core.ring.used()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.core.ring.capacity()
    }

    /// Push one buffer of stream data. Returns the number of bytes retained.
    pub fn ingest(&mut self, offset: u64, bytes: &[u8], kind: DataKind) -> SessionResult<usize> {
        if self.state == SessionState::Closed {
            return Err(SessionError::InvalidState("session closed"));
        }
        if bytes.is_empty() {
            return Err(SessionError::InvalidParam);
        }
        self.core
            .ingest(offset, bytes, kind, self.auth.as_ref(), self.ctrl.as_mut())
    }

    /// Probe the stream and attach the engine. On failure the session stays
    /// in the probe phase and a fresh open may be retried with more data.
    #[instrument(skip_all, fields(kind = ?kind))]
    pub fn open(
        &mut self,
        kind: MediaKind,
        mut engine: Box<dyn DemuxEngine>,
    ) -> SessionResult<MediaInfo> {
        if self.state != SessionState::Probing {
            return Err(SessionError::InvalidState("session already open"));
        }

        match self.try_open(kind, &mut engine) {
            Ok(media) => {
                self.core.probe_done = true;
                self.core.pos.reset_read();
                self.policy = TrackPolicy::from_media(&media);
                self.media = Some(media.clone());
                self.engine = Some(engine);
                self.state = SessionState::Streaming;
                Ok(media)
            }
            Err(err) => {
                // Leave the session probeable so the host can push more edge
                // data and retry.
                warn!(error = %err, "open failed");
                self.core.pos.reset_read();
                self.bundle = None;
                self.core.virtual_size = None;
                Err(err)
            }
        }
    }

    fn try_open(
        &mut self,
        kind: MediaKind,
        engine: &mut Box<dyn DemuxEngine>,
    ) -> SessionResult<MediaInfo> {
        if kind == MediaKind::Bundle {
            let mut adapter = PullAdapter::new(&mut self.core, self.ctrl.as_mut());
            self.bundle = Some(read_bundle_prologue(&mut adapter)?);
            if let Some(total) = self.core.pos.total_size() {
                // The payload interleaves two renditions of equal length;
                // the engine sees half of what remains after the prologue.
                let start = self.bundle.as_ref().map_or(0, |b| b.start_offset);
                self.core.virtual_size = Some(total.saturating_sub(start) / 2);
            }
        }

        let media = {
            let mut adapter = PullAdapter::new(&mut self.core, self.ctrl.as_mut());
            engine.probe(&mut adapter).map_err(map_engine_err)?
        };
        debug!(
            tracks = media.tracks.len(),
            duration_ms = media.duration_ms,
            "probe complete"
        );
        Ok(media)
    }

    /// Demux and decode until one packet's frames reach the sink.
    pub fn decode_step(&mut self, sink: &mut dyn FrameSink) -> SessionResult<StepOutcome> {
        self.ensure_open()?;
        if let Some(stalled) = self.backlog_gate() {
            return Ok(stalled);
        }

        loop {
            let pkt = match self.pull_packet() {
                Ok(pkt) => pkt,
                Err(StepEnd::Outcome(outcome)) => return Ok(outcome),
                Err(StepEnd::Failed(err)) => return Err(err),
            };
            if self.discards(&pkt) {
                continue;
            }

            let frames = match self.engine.as_mut() {
                Some(engine) => engine.decode(&pkt).map_err(map_engine_err)?,
                None => return Err(SessionError::InvalidState("engine detached")),
            };
            let mut delivered = false;
            for frame in frames {
                delivered |= self.dispatch(frame, sink);
            }
            if delivered {
                return Ok(StepOutcome::Decoded);
            }
            // Every frame of this packet predated the seek target; keep going.
        }
    }

    /// Demux one packet and forward it undecoded (passthrough mode).
    pub fn read_packet_step(&mut self, sink: &mut dyn FrameSink) -> SessionResult<StepOutcome> {
        self.ensure_open()?;
        if let Some(stalled) = self.backlog_gate() {
            return Ok(stalled);
        }

        loop {
            let pkt = match self.pull_packet() {
                Ok(pkt) => pkt,
                Err(StepEnd::Outcome(outcome)) => return Ok(outcome),
                Err(StepEnd::Failed(err)) => return Err(err),
            };
            if self.discards(&pkt) {
                continue;
            }

            let kind = match self.media.as_ref().and_then(|m| m.track(pkt.track)) {
                Some(track) => track.kind,
                None => continue,
            };
            sink.on_packet(&PacketOut {
                kind,
                data: &pkt.data,
                pts: pkt.pts,
                dts: pkt.dts,
                keyframe: pkt.keyframe,
            });
            return Ok(StepOutcome::Decoded);
        }
    }

    /// Reposition playback. Buffered sequential data is dropped; the host is
    /// expected to restart the downloader at the new byte offset. Video
    /// output stays suppressed until the next keyframe.
    pub fn seek_to(&mut self, seconds: f64) -> SessionResult<()> {
        self.ensure_open()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SessionError::InvalidParam);
        }
        info!(seconds, "seek requested");
        self.core.reset_sequential();
        self.begin_time = seconds;
        // Re-entrant seeks just move the target again.
        self.state = SessionState::Seeking;
        Ok(())
    }

    /// Select the next audio track, wrapping around.
    pub fn switch_audio_track(&mut self) -> SessionResult<u32> {
        self.ensure_open()?;
        self.policy
            .switch_audio()
            .ok_or(SessionError::InvalidState("no alternate audio track"))
    }

    /// Release the engine and reject further calls. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.close();
        }
        if self.state != SessionState::Closed {
            info!("session closed");
        }
        self.core.ring.reset();
        self.core.edges.clear();
        self.state = SessionState::Closed;
    }

    fn ensure_open(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Closed => Err(SessionError::InvalidState("session closed")),
            SessionState::Probing => Err(SessionError::InvalidState("session not open")),
            _ => Ok(()),
        }
    }

    /// Hold decoding until the backlog builds up, nudging the downloader.
    fn backlog_gate(&mut self) -> Option<StepOutcome> {
        let used = self.core.ring.used();
        if !self.core.end_of_stream && used < MIN_DECODE_BACKLOG {
            trace!(used, "backlog below decode threshold");
            self.core.flow.on_occupancy(used, self.ctrl.as_mut());
            return Some(StepOutcome::Stalled);
        }
        None
    }

    fn pull_packet(&mut self) -> Result<EnginePacket, StepEnd> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(StepEnd::Failed(SessionError::InvalidState(
                "engine detached",
            )));
        };
        let mut adapter = PullAdapter::new(&mut self.core, self.ctrl.as_mut());
        match engine.next_packet(&mut adapter) {
            Ok(pkt) => Ok(pkt),
            Err(EngineError::Eof) => Err(StepEnd::Outcome(StepOutcome::EndOfStream)),
            Err(EngineError::WouldBlock) => Err(StepEnd::Outcome(StepOutcome::Stalled)),
            Err(err) => Err(StepEnd::Failed(map_engine_err(err))),
        }
    }

    /// Packet-level drop decision: hidden audio tracks always, everything
    /// but video while seeking, non-key video until the seek resolves.
    fn discards(&mut self, pkt: &EnginePacket) -> bool {
        if self.policy.is_video(pkt.track) {
            if self.state == SessionState::Seeking {
                if pkt.keyframe {
                    debug!(pts = pkt.pts, "keyframe reached, seek resolved");
                    self.state = SessionState::Streaming;
                    return false;
                }
                trace!(pts = pkt.pts, "dropping non-key video during seek");
                return true;
            }
            false
        } else {
            self.state == SessionState::Seeking || !self.policy.is_forwarded(pkt.track)
        }
    }

    /// Deliver one frame unless it predates the seek target.
    fn dispatch(&mut self, frame: DecodedFrame, sink: &mut dyn FrameSink) -> bool {
        match frame {
            DecodedFrame::Video(frame) => {
                if frame.timestamp < self.begin_time {
                    trace!(timestamp = frame.timestamp, "dropping stale video frame");
                    return false;
                }
                sink.on_video_frame(&frame);
                true
            }
            DecodedFrame::Audio(frame) => {
                if frame.timestamp < self.begin_time {
                    return false;
                }
                sink.on_audio_frame(&frame);
                true
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.engine.is_some() {
            warn!("session dropped without close");
            self.close();
        }
    }
}

enum StepEnd {
    Outcome(StepOutcome),
    Failed(SessionError),
}

fn map_engine_err(err: EngineError) -> SessionError {
    match err {
        EngineError::Eof => SessionError::Eof,
        EngineError::WouldBlock => SessionError::Engine("engine would block".into()),
        EngineError::Malformed(msg) => SessionError::InvalidData(msg),
        EngineError::Other(msg) => SessionError::Engine(msg),
    }
}
