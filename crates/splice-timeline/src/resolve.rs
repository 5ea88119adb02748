//! Active-clip resolution.
//!
//! Given a timeline and a point in time, decide which clips are live and at
//! which source offset each decoder should sit.

use splice_core::MediaKind;

use crate::clip::{Clip, ClipId};
use crate::timeline::Timeline;
use crate::track::{Track, TrackId, TrackKind};

/// A clip that is live at the resolved time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedClip<'a> {
    pub clip: &'a Clip,
    pub track_id: TrackId,
    /// Position in the source the decoder should present.
    pub source_offset: f64,
    /// Mute flag of the owning track.
    pub track_muted: bool,
}

impl ResolvedClip<'_> {
    pub fn id(&self) -> ClipId {
        self.clip.id
    }
}

/// Live clips at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveClips<'a> {
    /// Visual clips in draw order (track order, then clip order).
    pub visual: Vec<ResolvedClip<'a>>,
    /// Clips that feed the audio mix.
    pub audio: Vec<ResolvedClip<'a>>,
}

impl ActiveClips<'_> {
    /// IDs of every clip in either list.
    pub fn ids(&self) -> impl Iterator<Item = ClipId> + '_ {
        self.visual.iter().chain(self.audio.iter()).map(|r| r.id())
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_empty() && self.audio.is_empty()
    }
}

/// Resolve the live clips of `timeline` at `time`.
///
/// Video tracks contribute their Video and Image clips to the visual list;
/// audio tracks contribute Audio and Video clips to the audio list. Sound
/// embedded in video clips on video tracks is not mixed.
pub fn resolve(timeline: &Timeline, time: f64) -> ActiveClips<'_> {
    let mut active = ActiveClips::default();
    for track in timeline.tracks() {
        let list = match track.kind {
            TrackKind::Video => &mut active.visual,
            TrackKind::Audio => &mut active.audio,
        };
        list.extend(
            track
                .clips
                .iter()
                .filter(|clip| accepts(track.kind, clip.kind) && clip.is_active_at(time))
                .map(|clip| resolved(track, clip, time)),
        );
    }
    active
}

fn accepts(track: TrackKind, clip: MediaKind) -> bool {
    match track {
        TrackKind::Video => matches!(clip, MediaKind::Video | MediaKind::Image),
        TrackKind::Audio => matches!(clip, MediaKind::Audio | MediaKind::Video),
    }
}

fn resolved<'a>(track: &Track, clip: &'a Clip, time: f64) -> ResolvedClip<'a> {
    ResolvedClip {
        clip,
        track_id: track.id,
        source_offset: clip.source_offset_at(time),
        track_muted: track.muted,
    }
}
