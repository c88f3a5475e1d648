//! Per-track forwarding policy.
//!
//! One video track and the currently selected audio track are forwarded;
//! every other track is dropped at the packet stage, before decoding.
//! Switching the audio selection rotates through the discovered audio
//! tracks without touching the decoder.

use tracing::info;

use crate::engine::{MediaInfo, TrackKind};

#[derive(Debug, Default)]
pub struct TrackPolicy {
    video_track: Option<u32>,
    audio_tracks: Vec<u32>,
    selected_audio: usize,
}

impl TrackPolicy {
    /// Derive the initial policy: first video track plus the first audio
    /// track are forwarded.
    pub fn from_media(media: &MediaInfo) -> Self {
        let video_track = media
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .map(|t| t.id);
        let audio_tracks = media
            .tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Audio)
            .map(|t| t.id)
            .collect();
        Self {
            video_track,
            audio_tracks,
            selected_audio: 0,
        }
    }

    pub fn is_video(&self, track: u32) -> bool {
        self.video_track == Some(track)
    }

    /// Whether packets and frames of `track` should reach the sink.
    pub fn is_forwarded(&self, track: u32) -> bool {
        self.is_video(track) || self.selected_audio_track() == Some(track)
    }

    pub fn selected_audio_track(&self) -> Option<u32> {
        self.audio_tracks.get(self.selected_audio).copied()
    }

    /// Advance the audio selection to the next track, wrapping around.
    /// Returns the newly selected track, or `None` if the stream carries
    /// fewer than two audio tracks.
    pub fn switch_audio(&mut self) -> Option<u32> {
        if self.audio_tracks.len() < 2 {
            return None;
        }
        self.selected_audio = (self.selected_audio + 1) % self.audio_tracks.len();
        let track = self.audio_tracks[self.selected_audio];
        info!(track, "audio track switched");
        Some(track)
    }
}
