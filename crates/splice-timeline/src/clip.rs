//! Clip types for the timeline.

use serde::{Deserialize, Serialize};
use splice_core::{MediaInfo, MediaKind, Mirror, TimeSpan};
use uuid::Uuid;

/// Identifier of a clip. Fresh for every created, duplicated or split-off clip.
pub type ClipId = Uuid;

/// A clip placed on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Clip name (displayed in UI)
    pub name: String,
    /// What the source presents
    pub kind: MediaKind,
    /// Path or URL of the source media
    pub source: String,
    /// Length of the underlying source in seconds
    pub source_duration: f64,
    /// Timeline position of the first presented instant
    pub start_time: f64,
    /// Length on the timeline, always `trim_end - trim_start`
    pub duration: f64,
    /// Source in point
    pub trim_start: f64,
    /// Source out point
    pub trim_end: f64,
    /// Clip gain (0.0 to 1.0)
    pub volume: f64,
    /// Clip opacity (0.0 to 1.0)
    pub opacity: f64,
    /// Present the trim window back to front
    pub reversed: bool,
    pub mirror_h: bool,
    pub mirror_v: bool,
}

impl Clip {
    /// Create a clip covering the whole probed source, placed at time zero.
    pub fn from_media(name: impl Into<String>, source: impl Into<String>, info: &MediaInfo) -> Self {
        let duration = info.duration_seconds;
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: info.kind,
            source: source.into(),
            source_duration: duration,
            start_time: 0.0,
            duration,
            trim_start: 0.0,
            trim_end: duration,
            volume: 1.0,
            opacity: 1.0,
            reversed: false,
            mirror_h: false,
            mirror_v: false,
        }
    }

    /// Timeline span occupied by the clip.
    pub fn span(&self) -> TimeSpan {
        TimeSpan::new(self.start_time, self.duration)
    }

    /// Timeline end (exclusive).
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// A clip is live on `[start_time, start_time + duration)`.
    pub fn is_active_at(&self, time: f64) -> bool {
        self.span().contains(time)
    }

    /// Source position to present at timeline time `time`.
    ///
    /// Reversed clips walk the trim window from `trim_end` downwards.
    pub fn source_offset_at(&self, time: f64) -> f64 {
        let relative = time - self.start_time;
        if self.reversed {
            self.trim_end - relative
        } else {
            relative + self.trim_start
        }
    }

    /// Mirror flags for the compositor.
    pub fn mirror(&self) -> Mirror {
        Mirror::new(self.mirror_h, self.mirror_v)
    }

    /// Whether the clip lands on the raster surface.
    pub fn is_visual(&self) -> bool {
        self.kind.is_visual()
    }

    /// Move the in point by `delta`. The clip keeps its material anchored to
    /// the timeline, so the start time moves with the in point.
    pub fn trim_in(&mut self, delta: f64) {
        self.trim_start += delta;
        self.start_time += delta;
        self.duration = self.trim_end - self.trim_start;
    }

    /// Move the out point by `delta`.
    pub fn trim_out(&mut self, delta: f64) {
        self.trim_end += delta;
        self.duration = self.trim_end - self.trim_start;
    }
}
