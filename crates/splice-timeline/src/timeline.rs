//! The timeline: tracks, playhead and derived duration.

use serde::{Deserialize, Serialize};
use splice_core::defaults::MIN_TIMELINE_DURATION;
use std::collections::HashSet;

use crate::clip::{Clip, ClipId};
use crate::track::{Track, TrackId, TrackKind};

/// A multi-track timeline.
///
/// `total_duration` is derived from the clips and never shorter than the
/// configured minimum; `current_time` always lies in `[0, total_duration]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub(crate) tracks: Vec<Track>,
    current_time: f64,
    total_duration: f64,
    min_duration: f64,
}

impl Timeline {
    /// Create a timeline without tracks.
    pub fn empty() -> Self {
        Self {
            tracks: Vec::new(),
            current_time: 0.0,
            total_duration: MIN_TIMELINE_DURATION,
            min_duration: MIN_TIMELINE_DURATION,
        }
    }

    /// Create the starter layout: two video tracks over two audio tracks.
    pub fn with_starter_tracks() -> Self {
        let mut timeline = Self::empty();
        timeline.tracks = vec![
            Track::new_video("Video 1"),
            Track::new_video("Video 2"),
            Track::new_audio("Audio 1"),
            Track::new_audio("Audio 2"),
        ];
        timeline
    }

    /// Override the minimum duration (defaults to 30 s).
    pub fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.min_duration = min_duration.max(0.0);
        self.recompute_duration();
        self
    }

    /// Append a track. Used while assembling the starter layout.
    pub fn push_track(&mut self, track: Track) -> TrackId {
        let id = track.id;
        self.tracks.push(track);
        self.recompute_duration();
        id
    }

    /// All tracks in declaration (z) order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Tracks of one kind, in declaration order.
    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Find a track by ID.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub(crate) fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Look up a clip on a specific track.
    pub fn clip(&self, track_id: TrackId, clip_id: ClipId) -> Option<&Clip> {
        self.track(track_id)
            .and_then(|t| t.find_clip(clip_id))
            .map(|(_, clip)| clip)
    }

    /// Look up a clip on any track.
    pub fn find_clip(&self, clip_id: ClipId) -> Option<(&Track, &Clip)> {
        self.tracks.iter().find_map(|track| {
            track
                .find_clip(clip_id)
                .map(|(_, clip)| (track, clip))
        })
    }

    /// IDs of every clip currently on the timeline.
    pub fn clip_ids(&self) -> HashSet<ClipId> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter().map(|c| c.id))
            .collect()
    }

    /// Total number of clips.
    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(Track::clip_count).sum()
    }

    /// Playhead position in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Set the playhead, clamped to `[0, total_duration]`.
    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = clamp_time(time, self.total_duration);
    }

    /// Derived timeline length.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Lower bound of `total_duration`.
    pub fn min_duration(&self) -> f64 {
        self.min_duration
    }

    /// Recompute `total_duration = max(min_duration, latest clip end)` and
    /// pull the playhead back into range.
    pub fn recompute_duration(&mut self) {
        let latest_end = self.tracks.iter().map(Track::end_time).fold(0.0, f64::max);
        self.total_duration = latest_end.max(self.min_duration);
        self.current_time = clamp_time(self.current_time, self.total_duration);
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_starter_tracks()
    }
}

fn clamp_time(time: f64, total: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.clamp(0.0, total)
}
