//! Numeric FFI bridge over [`StreamSession`].
//!
//! The JS host pushes bytes with `send_data` and drives decoding with
//! `decode_step`; output crosses back through registered callbacks. Every
//! fallible export returns an `i32`: non-negative on success, the negated
//! [`SessionError::code`] on failure. Timestamps cross the boundary as
//! `f64` seconds, packet pts/dts clamp to `i32` milliseconds.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Function, Uint8Array};
use sluice_buffer::{DownloaderControl, FlowSignal};
use sluice_session::{
    AudioFrame, AuthState, DataKind, DemuxEngine, FrameSink, MediaKind, PacketOut, SessionConfig,
    SessionError, StepOutcome, StreamSession, VideoFrame,
};
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

const STEP_DECODED: i32 = 0;
const STEP_STALLED: i32 = 1;
const STEP_END_OF_STREAM: i32 = 2;

fn err_code(err: &SessionError) -> i32 {
    -err.code()
}

fn step_code(outcome: StepOutcome) -> i32 {
    match outcome {
        StepOutcome::Decoded => STEP_DECODED,
        StepOutcome::Stalled => STEP_STALLED,
        StepOutcome::EndOfStream => STEP_END_OF_STREAM,
    }
}

/// Downloader control forwarding to a JS callback: `cb(1)` pauses,
/// `cb(0)` resumes.
struct JsDownloader {
    cb: Rc<RefCell<Option<Function>>>,
}

impl DownloaderControl for JsDownloader {
    fn control(&mut self, signal: FlowSignal) {
        let cb = self.cb.borrow();
        if let Some(cb) = cb.as_ref() {
            let flag = match signal {
                FlowSignal::Pause => 1.0,
                FlowSignal::Resume => 0.0,
            };
            if cb.call1(&JsValue::NULL, &JsValue::from_f64(flag)).is_err() {
                warn!("downloader control callback threw");
            }
        }
    }
}

struct FlagAuth {
    authorized: Rc<Cell<bool>>,
}

impl AuthState for FlagAuth {
    fn is_authorized(&self) -> bool {
        self.authorized.get()
    }
}

/// Frame and packet delivery into JS callbacks.
///
/// - video: `(pixels: Uint8Array, width, height, keyframe, timestamp)`
/// - audio: `(pcm: Uint8Array, sample_rate, channels, timestamp)`
/// - packet: `(data: Uint8Array, is_video, pts, dts, keyframe)`
#[derive(Default)]
struct JsSink {
    video: Option<Function>,
    audio: Option<Function>,
    packet: Option<Function>,
}

fn invoke(cb: &Function, args: &js_sys::Array, what: &str) {
    if cb.apply(&JsValue::NULL, args).is_err() {
        warn!(what, "sink callback threw");
    }
}

impl FrameSink for JsSink {
    fn on_video_frame(&mut self, frame: &VideoFrame) {
        if let Some(cb) = self.video.as_ref() {
            let args = js_sys::Array::of5(
                &Uint8Array::from(frame.pixels.as_ref()).into(),
                &JsValue::from_f64(frame.width as f64),
                &JsValue::from_f64(frame.height as f64),
                &JsValue::from_bool(frame.keyframe),
                &JsValue::from_f64(frame.timestamp),
            );
            invoke(cb, &args, "video");
        }
    }

    fn on_audio_frame(&mut self, frame: &AudioFrame) {
        if let Some(cb) = self.audio.as_ref() {
            let args = js_sys::Array::of4(
                &Uint8Array::from(frame.pcm.as_ref()).into(),
                &JsValue::from_f64(frame.sample_rate as f64),
                &JsValue::from_f64(frame.channels as f64),
                &JsValue::from_f64(frame.timestamp),
            );
            invoke(cb, &args, "audio");
        }
    }

    fn on_packet(&mut self, packet: &PacketOut<'_>) {
        if let Some(cb) = self.packet.as_ref() {
            // The FFI carries 32-bit timestamps; clamp rather than wrap.
            let pts = packet.pts.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            let dts = packet.dts.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            let args = js_sys::Array::of5(
                &Uint8Array::from(packet.data).into(),
                &JsValue::from_bool(packet.kind == sluice_session::TrackKind::Video),
                &JsValue::from_f64(pts as f64),
                &JsValue::from_f64(dts as f64),
                &JsValue::from_bool(packet.keyframe),
            );
            invoke(cb, &args, "packet");
        }
    }
}

#[wasm_bindgen]
pub struct SluiceBridge {
    session: StreamSession,
    sink: JsSink,
    pending_engine: Option<Box<dyn DemuxEngine>>,
    downloader_cb: Rc<RefCell<Option<Function>>>,
    authorized: Rc<Cell<bool>>,
}

#[wasm_bindgen]
impl SluiceBridge {
    /// `expected_size <= 0` means the total stream size is unknown.
    #[wasm_bindgen(constructor)]
    pub fn new(expected_size: f64, decryption_enabled: bool) -> Self {
        let downloader_cb: Rc<RefCell<Option<Function>>> = Rc::default();
        let authorized = Rc::new(Cell::new(!decryption_enabled));
        let config = SessionConfig {
            expected_size: (expected_size > 0.0).then_some(expected_size as u64),
            decryption_enabled,
            ..SessionConfig::default()
        };
        info!(expected_size, decryption_enabled, "bridge created");
        Self {
            session: StreamSession::new(
                config,
                Box::new(JsDownloader {
                    cb: Rc::clone(&downloader_cb),
                }),
                Box::new(FlagAuth {
                    authorized: Rc::clone(&authorized),
                }),
            ),
            sink: JsSink::default(),
            pending_engine: None,
            downloader_cb,
            authorized,
        }
    }

    pub fn set_downloader_callback(&mut self, cb: Function) {
        self.downloader_cb.replace(Some(cb));
    }

    pub fn set_video_callback(&mut self, cb: Function) {
        self.sink.video = Some(cb);
    }

    pub fn set_audio_callback(&mut self, cb: Function) {
        self.sink.audio = Some(cb);
    }

    pub fn set_packet_callback(&mut self, cb: Function) {
        self.sink.packet = Some(cb);
    }

    pub fn set_authorized(&mut self, authorized: bool) {
        self.authorized.set(authorized);
    }

    /// Push one buffer. `kind`: 0 head, 1 stream, 100 tail. Returns bytes
    /// retained, or a negative error code.
    pub fn send_data(&mut self, offset: f64, data: &[u8], kind: i32) -> i32 {
        let Some(kind) = DataKind::from_wire(kind) else {
            return err_code(&SessionError::InvalidParam);
        };
        if offset < 0.0 {
            return err_code(&SessionError::InvalidParam);
        }
        match self.session.ingest(offset as u64, data, kind) {
            Ok(n) => n as i32,
            Err(err) => err_code(&err),
        }
    }

    /// Probe the stream with the registered engine. `bundle` selects the
    /// music-bundle prologue path.
    pub fn open_session(&mut self, bundle: bool) -> i32 {
        let Some(engine) = self.pending_engine.take() else {
            return err_code(&SessionError::InvalidState("no engine registered"));
        };
        let kind = if bundle {
            MediaKind::Bundle
        } else {
            MediaKind::Transport
        };
        match self.session.open(kind, engine) {
            Ok(_) => 0,
            Err(err) => err_code(&err),
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.session.media().map_or(0.0, |m| m.duration_ms as f64)
    }

    pub fn track_count(&self) -> u32 {
        self.session.media().map_or(0, |m| m.tracks.len() as u32)
    }

    pub fn decode_step(&mut self) -> i32 {
        match self.session.decode_step(&mut self.sink) {
            Ok(outcome) => step_code(outcome),
            Err(err) => err_code(&err),
        }
    }

    pub fn read_packet_step(&mut self) -> i32 {
        match self.session.read_packet_step(&mut self.sink) {
            Ok(outcome) => step_code(outcome),
            Err(err) => err_code(&err),
        }
    }

    pub fn seek_to(&mut self, seconds: f64) -> i32 {
        match self.session.seek_to(seconds) {
            Ok(()) => 0,
            Err(err) => err_code(&err),
        }
    }

    /// Returns the newly selected audio track id, or a negative error code.
    pub fn switch_audio_track(&mut self) -> i32 {
        match self.session.switch_audio_track() {
            Ok(track) => track as i32,
            Err(err) => err_code(&err),
        }
    }

    pub fn buffered_bytes(&self) -> f64 {
        self.session.buffered_bytes() as f64
    }

    pub fn buffer_capacity(&self) -> f64 {
        self.session.buffer_capacity() as f64
    }

    /// Lyrics from the bundle prologue; empty for transport streams.
    pub fn lyrics(&self) -> Vec<u8> {
        self.session
            .bundle()
            .map_or_else(Vec::new, |b| b.lyrics.clone())
    }

    pub fn close_session(&mut self) {
        self.session.close();
    }
}

impl SluiceBridge {
    /// Attach the engine used by the next `open_session` call. Not exported;
    /// the embedding wasm app wires its engine here from Rust.
    pub fn register_engine(&mut self, engine: Box<dyn DemuxEngine>) {
        self.pending_engine = Some(engine);
    }
}
