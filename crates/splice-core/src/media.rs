//! Media descriptions shared by the timeline and the decoder provider.

use serde::{Deserialize, Serialize};

/// Kind of media a clip presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Video and still images end up on the raster surface.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Video | Self::Image)
    }
}

/// Result of probing a media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// What the source contains
    pub kind: MediaKind,
    /// Playable length in seconds
    pub duration_seconds: f64,
    /// Picture width, if the source has one
    pub width: Option<u32>,
    /// Picture height, if the source has one
    pub height: Option<u32>,
    /// Whether the source carries an audio stream
    pub has_audio: bool,
}

impl MediaInfo {
    /// Probe result for a video source.
    pub fn video(duration_seconds: f64, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            duration_seconds,
            width: Some(width),
            height: Some(height),
            has_audio: true,
        }
    }

    /// Probe result for an audio-only source.
    pub fn audio(duration_seconds: f64) -> Self {
        Self {
            kind: MediaKind::Audio,
            duration_seconds,
            width: None,
            height: None,
            has_audio: true,
        }
    }

    /// Probe result for a still image shown for `duration_seconds`.
    pub fn image(duration_seconds: f64, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Image,
            duration_seconds,
            width: Some(width),
            height: Some(height),
            has_audio: false,
        }
    }
}
