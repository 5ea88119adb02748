//! Edit operations.
//!
//! Every mutation is an `EditCommand` applied as a value transformation:
//! the source timeline is left untouched and a new one is returned. An edit
//! that cannot be applied (unknown ids, split outside the clip, trim past the
//! source) yields the unchanged timeline.

use splice_core::time::TIME_EPSILON;
use splice_core::{MediaInfo, MediaKind};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::clip::{Clip, ClipId};
use crate::timeline::Timeline;
use crate::track::{TrackId, TrackKind};

// ── Field edits ─────────────────────────────────────────────────

/// A single clip property change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipField {
    /// Clip gain, clamped to [0, 1].
    Volume(f64),
    /// Clip opacity, clamped to [0, 1].
    Opacity(f64),
    Reversed(bool),
    MirrorH(bool),
    MirrorV(bool),
}

impl ClipField {
    fn apply_to(self, clip: &mut Clip) -> Result<(), EditError> {
        match self {
            Self::Volume(v) => clip.volume = unit_interval(v)?,
            Self::Opacity(v) => clip.opacity = unit_interval(v)?,
            Self::Reversed(b) => clip.reversed = b,
            Self::MirrorH(b) => clip.mirror_h = b,
            Self::MirrorV(b) => clip.mirror_v = b,
        }
        Ok(())
    }
}

fn unit_interval(value: f64) -> Result<f64, EditError> {
    if value.is_nan() {
        return Err(EditError::InvalidValue("NaN".into()));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Which end of the trim window a trim moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEdge {
    /// Move `trim_start` (and the timeline start with it).
    In,
    /// Move `trim_end`.
    Out,
}

// ── Errors ──────────────────────────────────────────────────────

/// Why an edit was refused. Never escapes the timeline model as a failure:
/// `Timeline::apply` turns it into a no-op.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("clip {0} not found")]
    ClipNotFound(ClipId),

    #[error("split offset {offset:.3}s is outside (0, {duration:.3}s)")]
    InvalidSplit { offset: f64, duration: f64 },

    #[error("invalid trim: {0}")]
    InvalidTrim(String),

    #[error("invalid clip: {0}")]
    InvalidClip(String),

    #[error("{kind:?} clips cannot be placed on {track:?} tracks")]
    KindMismatch { kind: MediaKind, track: TrackKind },

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

// ── Edit commands ───────────────────────────────────────────────

/// A timeline edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Append a clip to a track.
    AddClip { track_id: TrackId, clip: Clip },
    /// Remove a clip.
    RemoveClip { track_id: TrackId, clip_id: ClipId },
    /// Copy a clip and place the copy right after the original.
    DuplicateClip { track_id: TrackId, clip_id: ClipId },
    /// Cut a clip in two at an absolute timeline time.
    SplitClip {
        track_id: TrackId,
        clip_id: ClipId,
        at_time: f64,
    },
    /// Move one end of the trim window.
    TrimClip {
        track_id: TrackId,
        clip_id: ClipId,
        edge: TrimEdge,
        delta: f64,
    },
    /// Change a clip property.
    SetClipField {
        track_id: TrackId,
        clip_id: ClipId,
        field: ClipField,
    },
    /// Mute or unmute a whole track.
    SetTrackMuted { track_id: TrackId, muted: bool },
    /// A batch of commands applied atomically.
    Batch(Vec<EditCommand>),
}

impl EditCommand {
    /// Add a freshly imported source to a track at time zero.
    pub fn add_media(
        track_id: TrackId,
        name: impl Into<String>,
        source: impl Into<String>,
        info: &MediaInfo,
    ) -> Self {
        Self::AddClip {
            track_id,
            clip: Clip::from_media(name, source, info),
        }
    }

    /// Short label for logs and history entries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddClip { .. } => "add clip",
            Self::RemoveClip { .. } => "remove clip",
            Self::DuplicateClip { .. } => "duplicate clip",
            Self::SplitClip { .. } => "split clip",
            Self::TrimClip { .. } => "trim clip",
            Self::SetClipField { .. } => "set clip field",
            Self::SetTrackMuted { .. } => "set track mute",
            Self::Batch(_) => "batch",
        }
    }

    fn apply_in_place(&self, timeline: &mut Timeline, created: &mut Vec<ClipId>) -> Result<(), EditError> {
        match self {
            Self::AddClip { track_id, clip } => {
                check_clip_shape(clip)?;
                let track = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?;
                let fits = match track.kind {
                    TrackKind::Video => clip.kind.is_visual(),
                    TrackKind::Audio => clip.kind != MediaKind::Image,
                };
                if !fits {
                    return Err(EditError::KindMismatch {
                        kind: clip.kind,
                        track: track.kind,
                    });
                }
                created.push(clip.id);
                track.clips.push(clip.clone());
            }
            Self::RemoveClip { track_id, clip_id } => {
                let track = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?;
                let (index, _) = track
                    .find_clip(*clip_id)
                    .ok_or(EditError::ClipNotFound(*clip_id))?;
                track.clips.remove(index);
            }
            Self::DuplicateClip { track_id, clip_id } => {
                let track = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?;
                let (index, original) = track
                    .find_clip(*clip_id)
                    .ok_or(EditError::ClipNotFound(*clip_id))?;
                let mut copy = original.clone();
                copy.id = Uuid::new_v4();
                copy.name = format!("{} (copy)", original.name);
                copy.start_time = original.start_time + original.duration;
                created.push(copy.id);
                track.clips.insert(index + 1, copy);
            }
            Self::SplitClip {
                track_id,
                clip_id,
                at_time,
            } => {
                let track = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?;
                let (index, original) = track
                    .find_clip(*clip_id)
                    .ok_or(EditError::ClipNotFound(*clip_id))?;
                let offset = at_time - original.start_time;
                if !(offset > 0.0 && offset < original.duration) {
                    return Err(EditError::InvalidSplit {
                        offset,
                        duration: original.duration,
                    });
                }

                // Right half
                let mut right = original.clone();
                right.id = Uuid::new_v4();
                right.name = format!("{} (split)", original.name);
                right.start_time = original.start_time + offset;
                right.duration = original.duration - offset;
                right.trim_start = original.trim_start + offset;

                // Left half keeps the id
                let left = &mut track.clips[index];
                left.duration = offset;
                left.trim_end = left.trim_start + offset;

                created.push(right.id);
                track.clips.insert(index + 1, right);
            }
            Self::TrimClip {
                track_id,
                clip_id,
                edge,
                delta,
            } => {
                let clip = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?
                    .find_clip_mut(*clip_id)
                    .ok_or(EditError::ClipNotFound(*clip_id))?;
                check_trim(clip, *edge, *delta)?;
                match edge {
                    TrimEdge::In => clip.trim_in(*delta),
                    TrimEdge::Out => clip.trim_out(*delta),
                }
            }
            Self::SetClipField {
                track_id,
                clip_id,
                field,
            } => {
                let clip = timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?
                    .find_clip_mut(*clip_id)
                    .ok_or(EditError::ClipNotFound(*clip_id))?;
                field.apply_to(clip)?;
            }
            Self::SetTrackMuted { track_id, muted } => {
                timeline
                    .track_mut(*track_id)
                    .ok_or(EditError::TrackNotFound(*track_id))?
                    .muted = *muted;
            }
            Self::Batch(commands) => {
                for cmd in commands {
                    cmd.apply_in_place(timeline, created)?;
                }
            }
        }
        Ok(())
    }
}

fn check_trim(clip: &Clip, edge: TrimEdge, delta: f64) -> Result<(), EditError> {
    if !delta.is_finite() {
        return Err(EditError::InvalidTrim(format!("non-finite delta {delta}")));
    }
    match edge {
        TrimEdge::In => {
            let trim_start = clip.trim_start + delta;
            if trim_start < -TIME_EPSILON {
                return Err(EditError::InvalidTrim("in point before source start".into()));
            }
            if clip.start_time + delta < -TIME_EPSILON {
                return Err(EditError::InvalidTrim("clip would start before zero".into()));
            }
            if clip.trim_end - trim_start <= TIME_EPSILON {
                return Err(EditError::InvalidTrim("clip would have no duration".into()));
            }
        }
        TrimEdge::Out => {
            let trim_end = clip.trim_end + delta;
            if trim_end > clip.source_duration + TIME_EPSILON {
                return Err(EditError::InvalidTrim("out point past source end".into()));
            }
            if trim_end - clip.trim_start <= TIME_EPSILON {
                return Err(EditError::InvalidTrim("clip would have no duration".into()));
            }
        }
    }
    Ok(())
}

/// A successfully applied edit.
#[derive(Debug, Clone)]
pub struct Applied {
    /// The edited timeline.
    pub timeline: Timeline,
    /// Clips created by the edit (added, duplicated or split off).
    pub created: Vec<ClipId>,
}

impl Timeline {
    /// Apply an edit, reporting why it was refused.
    pub fn try_apply(&self, command: &EditCommand) -> Result<Applied, EditError> {
        let mut timeline = self.clone();
        let mut created = Vec::new();
        command.apply_in_place(&mut timeline, &mut created)?;
        timeline.recompute_duration();
        Ok(Applied { timeline, created })
    }

    /// Apply an edit. A refused edit returns the timeline unchanged.
    pub fn apply(&self, command: &EditCommand) -> Timeline {
        match self.try_apply(command) {
            Ok(applied) => applied.timeline,
            Err(e) => {
                debug!("Ignoring {}: {}", command.label(), e);
                self.clone()
            }
        }
    }
}

/// Refuse clips whose placement or trim window is inconsistent.
fn check_clip_shape(clip: &Clip) -> Result<(), EditError> {
    if !(clip.duration > 0.0) {
        return Err(EditError::InvalidClip(format!(
            "duration must be positive, got {}",
            clip.duration
        )));
    }
    if !clip.start_time.is_finite() || clip.start_time < 0.0 {
        return Err(EditError::InvalidClip(format!(
            "start time must be finite and non-negative, got {}",
            clip.start_time
        )));
    }
    // Negated comparisons so NaN trims fail too
    if !(clip.trim_start >= 0.0 && clip.trim_start < clip.trim_end && clip.trim_end <= clip.source_duration) {
        return Err(EditError::InvalidClip(format!(
            "trim window [{}, {}] does not fit a {}s source",
            clip.trim_start, clip.trim_end, clip.source_duration
        )));
    }
    if (clip.duration - (clip.trim_end - clip.trim_start)).abs() > TIME_EPSILON {
        return Err(EditError::InvalidClip(format!(
            "duration {} does not match trim window length {}",
            clip.duration,
            clip.trim_end - clip.trim_start
        )));
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;
    use proptest::prelude::*;

    fn video_info(secs: f64) -> MediaInfo {
        MediaInfo::video(secs, 1280, 720)
    }

    /// Timeline with one clip of `duration` seconds at `start` on the first video track.
    fn timeline_with_clip(start: f64, duration: f64) -> (Timeline, TrackId, ClipId) {
        let timeline = Timeline::with_starter_tracks();
        let track_id = timeline.tracks()[0].id;
        let mut clip = Clip::from_media("clip", "clip.mp4", &video_info(duration));
        clip.start_time = start;
        let clip_id = clip.id;
        let timeline = timeline.apply(&EditCommand::AddClip { track_id, clip });
        (timeline, track_id, clip_id)
    }

    #[test]
    fn test_add_media_appends_at_zero() {
        let timeline = Timeline::with_starter_tracks();
        let track_id = timeline.tracks()[0].id;
        let applied = timeline
            .try_apply(&EditCommand::add_media(track_id, "a", "a.mp4", &video_info(42.0)))
            .unwrap();
        let track = applied.timeline.track(track_id).unwrap();
        assert_eq!(track.clip_count(), 1);
        assert_eq!(track.clips[0].start_time, 0.0);
        assert_eq!(applied.created, vec![track.clips[0].id]);
        assert_eq!(applied.timeline.total_duration(), 42.0);
        // Source timeline untouched
        assert_eq!(timeline.clip_count(), 0);
    }

    #[test]
    fn test_add_rejects_kind_mismatch() {
        let timeline = Timeline::with_starter_tracks();
        let video_track = timeline.tracks()[0].id;
        let err = timeline
            .try_apply(&EditCommand::add_media(video_track, "a", "a.wav", &MediaInfo::audio(3.0)))
            .unwrap_err();
        assert!(matches!(err, EditError::KindMismatch { .. }));
    }

    #[test]
    fn test_video_clip_allowed_on_audio_track() {
        let timeline = Timeline::with_starter_tracks();
        let audio_track = timeline.tracks()[2].id;
        let next = timeline.apply(&EditCommand::add_media(audio_track, "v", "v.mp4", &video_info(3.0)));
        assert_eq!(next.track(audio_track).unwrap().clip_count(), 1);
    }

    fn add_err(mutate: impl FnOnce(&mut Clip)) -> EditError {
        let timeline = Timeline::with_starter_tracks();
        let track_id = timeline.tracks()[0].id;
        let mut clip = Clip::from_media("c", "c.mp4", &video_info(10.0));
        mutate(&mut clip);
        timeline
            .try_apply(&EditCommand::AddClip { track_id, clip })
            .unwrap_err()
    }

    #[test]
    fn test_add_rejects_duration_off_trim_window() {
        let err = add_err(|c| c.duration = 3.0);
        assert!(matches!(err, EditError::InvalidClip(_)));
    }

    #[test]
    fn test_add_rejects_negative_or_nan_start() {
        assert!(matches!(add_err(|c| c.start_time = -5.0), EditError::InvalidClip(_)));
        assert!(matches!(add_err(|c| c.start_time = f64::NAN), EditError::InvalidClip(_)));
        assert!(matches!(add_err(|c| c.start_time = f64::INFINITY), EditError::InvalidClip(_)));
    }

    #[test]
    fn test_add_rejects_trim_window_outside_source() {
        let err = add_err(|c| {
            c.trim_start = -1.0;
            c.duration = c.trim_end - c.trim_start;
        });
        assert!(matches!(err, EditError::InvalidClip(_)));

        let err = add_err(|c| {
            c.trim_end = 12.0;
            c.duration = c.trim_end - c.trim_start;
        });
        assert!(matches!(err, EditError::InvalidClip(_)));

        let err = add_err(|c| c.trim_start = f64::NAN);
        assert!(matches!(err, EditError::InvalidClip(_)));
    }

    #[test]
    fn test_add_accepts_consistent_trimmed_clip() {
        let timeline = Timeline::with_starter_tracks();
        let track_id = timeline.tracks()[0].id;
        let mut clip = Clip::from_media("c", "c.mp4", &video_info(10.0));
        clip.trim_start = 2.5;
        clip.trim_end = 7.0;
        clip.duration = 4.5;
        clip.start_time = 1.0;
        let applied = timeline.try_apply(&EditCommand::AddClip { track_id, clip }).unwrap();
        assert_eq!(applied.timeline.clip_count(), 1);
    }

    #[test]
    fn test_remove_missing_clip_is_noop() {
        let (timeline, track_id, _) = timeline_with_clip(0.0, 5.0);
        let next = timeline.apply(&EditCommand::RemoveClip {
            track_id,
            clip_id: Uuid::new_v4(),
        });
        assert_eq!(next, timeline);
    }

    #[test]
    fn test_remove_last_long_clip_falls_back_to_minimum() {
        let (timeline, track_id, clip_id) = timeline_with_clip(20.0, 25.0);
        assert_eq!(timeline.total_duration(), 45.0);
        let next = timeline.apply(&EditCommand::RemoveClip { track_id, clip_id });
        assert_eq!(next.total_duration(), 30.0);
    }

    #[test]
    fn test_duplicate_places_copy_after_original() {
        let (timeline, track_id, clip_id) = timeline_with_clip(5.0, 3.0);
        let timeline = timeline.apply(&EditCommand::SetClipField {
            track_id,
            clip_id,
            field: ClipField::MirrorH(true),
        });
        let applied = timeline
            .try_apply(&EditCommand::DuplicateClip { track_id, clip_id })
            .unwrap();
        let track = applied.timeline.track(track_id).unwrap();
        let original = &track.clips[0];
        let copy = &track.clips[1];
        assert_ne!(copy.id, original.id);
        assert_eq!(applied.created, vec![copy.id]);
        assert_eq!(copy.start_time, 8.0);
        assert_eq!(copy.duration, original.duration);
        assert_eq!(copy.trim_start, original.trim_start);
        assert_eq!(copy.trim_end, original.trim_end);
        assert_eq!(copy.volume, original.volume);
        assert_eq!(copy.opacity, original.opacity);
        assert!(copy.mirror_h);
    }

    #[test]
    fn test_split_tiles_original() {
        let (timeline, track_id, clip_id) = timeline_with_clip(2.0, 10.0);
        let next = timeline.apply(&EditCommand::SplitClip {
            track_id,
            clip_id,
            at_time: 6.0,
        });
        let track = next.track(track_id).unwrap();
        assert_eq!(track.clip_count(), 2);
        let (a, b) = (&track.clips[0], &track.clips[1]);
        assert_eq!(a.id, clip_id);
        assert_ne!(b.id, clip_id);
        assert_eq!(a.duration, 4.0);
        assert_eq!(b.duration, 6.0);
        assert_eq!(a.start_time, 2.0);
        assert_eq!(a.end_time(), b.start_time);
        assert_eq!(b.end_time(), 12.0);
        assert_eq!(a.trim_end, b.trim_start);
        assert_eq!(b.trim_end, 10.0);
    }

    #[test]
    fn test_split_at_bounds_is_noop() {
        let (timeline, track_id, clip_id) = timeline_with_clip(2.0, 10.0);
        for at_time in [2.0, 1.0, 12.0, 15.0] {
            let err = timeline
                .try_apply(&EditCommand::SplitClip {
                    track_id,
                    clip_id,
                    at_time,
                })
                .unwrap_err();
            assert!(matches!(err, EditError::InvalidSplit { .. }));
            let next = timeline.apply(&EditCommand::SplitClip {
                track_id,
                clip_id,
                at_time,
            });
            assert_eq!(next, timeline);
        }
    }

    #[test]
    fn test_split_inherits_fields() {
        let (timeline, track_id, clip_id) = timeline_with_clip(0.0, 10.0);
        let timeline = timeline.apply(&EditCommand::Batch(vec![
            EditCommand::SetClipField {
                track_id,
                clip_id,
                field: ClipField::Volume(0.25),
            },
            EditCommand::SetClipField {
                track_id,
                clip_id,
                field: ClipField::Reversed(true),
            },
        ]));
        let next = timeline.apply(&EditCommand::SplitClip {
            track_id,
            clip_id,
            at_time: 3.0,
        });
        let right = &next.track(track_id).unwrap().clips[1];
        assert_eq!(right.volume, 0.25);
        assert!(right.reversed);
    }

    #[test]
    fn test_set_field_clamps() {
        let (timeline, track_id, clip_id) = timeline_with_clip(0.0, 4.0);
        let next = timeline.apply(&EditCommand::SetClipField {
            track_id,
            clip_id,
            field: ClipField::Opacity(1.7),
        });
        assert_eq!(next.clip(track_id, clip_id).unwrap().opacity, 1.0);
        let next = next.apply(&EditCommand::SetClipField {
            track_id,
            clip_id,
            field: ClipField::Volume(f64::NAN),
        });
        assert_eq!(next.clip(track_id, clip_id).unwrap().volume, 1.0);
    }

    #[test]
    fn test_trim_rejects_past_source() {
        let (timeline, track_id, clip_id) = timeline_with_clip(0.0, 4.0);
        let err = timeline
            .try_apply(&EditCommand::TrimClip {
                track_id,
                clip_id,
                edge: TrimEdge::Out,
                delta: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, EditError::InvalidTrim(_)));
    }

    #[test]
    fn test_trim_in_moves_start() {
        let (timeline, track_id, clip_id) = timeline_with_clip(3.0, 4.0);
        let next = timeline.apply(&EditCommand::TrimClip {
            track_id,
            clip_id,
            edge: TrimEdge::In,
            delta: 1.5,
        });
        let clip = next.clip(track_id, clip_id).unwrap();
        assert_eq!(clip.start_time, 4.5);
        assert_eq!(clip.trim_start, 1.5);
        assert_eq!(clip.duration, 2.5);
    }

    #[test]
    fn test_batch_is_atomic() {
        let (timeline, track_id, clip_id) = timeline_with_clip(0.0, 4.0);
        let next = timeline.apply(&EditCommand::Batch(vec![
            EditCommand::SetTrackMuted {
                track_id,
                muted: true,
            },
            EditCommand::RemoveClip {
                track_id,
                clip_id: Uuid::new_v4(),
            },
        ]));
        assert!(!next.track(track_id).unwrap().muted);
        assert_eq!(next.clip(track_id, clip_id).map(|c| c.id), Some(clip_id));
    }

    #[test]
    fn test_unknown_track() {
        let timeline = Timeline::with_starter_tracks();
        let stray = Track::new_video("stray");
        let err = timeline
            .try_apply(&EditCommand::SetTrackMuted {
                track_id: stray.id,
                muted: true,
            })
            .unwrap_err();
        assert_eq!(err, EditError::TrackNotFound(stray.id));
    }

    proptest! {
        #[test]
        fn prop_split_preserves_span_and_trim(
            start in 0.0f64..100.0,
            duration in 0.5f64..60.0,
            fraction in 0.01f64..0.99,
        ) {
            let (timeline, track_id, clip_id) = timeline_with_clip(start, duration);
            let at_time = start + duration * fraction;
            let next = timeline.apply(&EditCommand::SplitClip { track_id, clip_id, at_time });
            let track = next.track(track_id).unwrap();
            prop_assert_eq!(track.clip_count(), 2);
            let (a, b) = (&track.clips[0], &track.clips[1]);
            prop_assert!((a.start_time - start).abs() < 1e-9);
            prop_assert!((a.end_time() - b.start_time).abs() < 1e-9);
            prop_assert!((b.end_time() - (start + duration)).abs() < 1e-9);
            prop_assert!((a.trim_end - b.trim_start).abs() < 1e-9);
            prop_assert!((a.duration - (a.trim_end - a.trim_start)).abs() < 1e-9);
            prop_assert!((b.duration - (b.trim_end - b.trim_start)).abs() < 1e-9);
        }

        #[test]
        fn prop_trim_keeps_duration_invariant(delta in -3.0f64..3.0, trim_in in any::<bool>()) {
            let (timeline, track_id, clip_id) = timeline_with_clip(5.0, 8.0);
            let next = timeline.apply(&EditCommand::TrimClip {
                track_id,
                clip_id,
                edge: if trim_in { TrimEdge::In } else { TrimEdge::Out },
                delta,
            });
            let clip = next.clip(track_id, clip_id).unwrap();
            prop_assert!(clip.duration > 0.0);
            prop_assert!((clip.duration - (clip.trim_end - clip.trim_start)).abs() < 1e-9);
            prop_assert!(clip.trim_start >= -1e-9);
            prop_assert!(clip.trim_end <= clip.source_duration + 1e-9);
        }
    }
}
