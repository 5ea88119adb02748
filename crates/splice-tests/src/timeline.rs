//! Integration tests for editing through the engine.
//!
//! Exercises splice-timeline edits together with the decoder pool and
//! the compositor preview.

use splice_core::MediaInfo;
use splice_engine::ClockState;
use splice_timeline::{resolve, Clip, ClipField, EditCommand, TrackKind, TrimEdge};

use crate::fixture::{Fixture, BLACK, BLUE, RED};

// ── Placement & resolution ─────────────────────────────────────

#[test]
fn clip_is_live_on_half_open_window() {
    let mut fx = Fixture::new();
    let mut clip = Clip::from_media("short", "red.mp4", &MediaInfo::video(3.0, 8, 8));
    clip.start_time = 2.0;
    let track_id = fx.track(TrackKind::Video);
    fx.engine
        .edit(&EditCommand::AddClip { track_id, clip })
        .unwrap();

    let now = fx.at(0.0);
    for (t, expected) in [(1.99, BLACK), (2.0, RED), (4.99, RED), (5.0, BLACK)] {
        fx.engine.seek(t, now);
        assert_eq!(fx.pixel(), expected, "at {t}");
    }
}

#[test]
fn later_clips_draw_on_top() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);
    fx.place(TrackKind::Video, "blue.mp4", 0.0);

    let timeline = fx.engine.timeline().clone();
    let active = resolve(&timeline, 1.0);
    assert_eq!(active.visual.len(), 2);
    assert_eq!(active.visual[1].clip.source, "blue.mp4");
    assert_eq!(fx.pixel(), BLUE);
    assert_eq!(fx.engine.snapshot().compose.drawn, 2);
}

#[test]
fn opacity_blends_over_lower_clip() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);
    let blue = fx.place(TrackKind::Video, "blue.mp4", 0.0);
    fx.set(TrackKind::Video, blue, ClipField::Opacity(0.5));

    let [r, g, b, a] = fx.pixel();
    assert!((127..=128).contains(&r));
    assert_eq!(g, 0);
    assert!((127..=128).contains(&b));
    assert_eq!(a, 255);
}

// ── Structural edits ───────────────────────────────────────────

#[test]
fn split_tiles_and_both_halves_render() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 1.0);
    let track_id = fx.track(TrackKind::Video);

    let created = fx
        .engine
        .edit(&EditCommand::SplitClip {
            track_id,
            clip_id: id,
            at_time: 4.0,
        })
        .unwrap();
    assert_eq!(created.len(), 1);

    let track = fx.engine.timeline().track(track_id).unwrap();
    let (_, left) = track.find_clip(id).unwrap();
    let (_, right) = track.find_clip(created[0]).unwrap();
    assert_eq!(left.end_time(), right.start_time);
    assert_eq!(left.trim_end, right.trim_start);
    assert!((left.duration + right.duration - 10.0).abs() < 1e-9);

    fx.engine.seek(6.0, fx.at(0.0));
    assert_eq!(fx.pixel(), RED);
    assert!(fx.engine.pool().contains(created[0]));
}

#[test]
fn split_on_boundary_is_refused() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 1.0);
    let track_id = fx.track(TrackKind::Video);

    for at_time in [1.0, 11.0] {
        assert!(fx
            .engine
            .edit(&EditCommand::SplitClip {
                track_id,
                clip_id: id,
                at_time,
            })
            .is_err());
    }
    assert_eq!(fx.engine.timeline().clip_count(), 1);
}

#[test]
fn duplicate_lands_after_original() {
    let mut fx = Fixture::new();
    let mut clip = Clip::from_media("c", "red.mp4", &MediaInfo::video(6.0, 8, 8));
    clip.start_time = 2.0;
    let track_id = fx.track(TrackKind::Video);
    let id = fx.engine.edit(&EditCommand::AddClip { track_id, clip }).unwrap()[0];

    let created = fx
        .engine
        .edit(&EditCommand::DuplicateClip {
            track_id,
            clip_id: id,
        })
        .unwrap();
    let (_, copy) = fx.engine.timeline().find_clip(created[0]).unwrap();
    assert_ne!(copy.id, id);
    assert_eq!(copy.start_time, 8.0);
}

#[test]
fn removing_everything_falls_back_to_minimum_duration() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Audio, "music.wav", 25.0);
    assert_eq!(fx.engine.timeline().total_duration(), 45.0);

    fx.engine.seek(40.0, fx.at(0.0));
    fx.engine
        .edit(&EditCommand::RemoveClip {
            track_id: fx.track(TrackKind::Audio),
            clip_id: id,
        })
        .unwrap();

    assert_eq!(fx.engine.timeline().total_duration(), 30.0);
    assert_eq!(fx.engine.current_time(), 30.0);
    assert!(!fx.engine.pool().contains(id));
}

#[test]
fn trim_keeps_duration_in_step() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 0.0);
    let track_id = fx.track(TrackKind::Video);

    fx.engine
        .edit(&EditCommand::TrimClip {
            track_id,
            clip_id: id,
            edge: TrimEdge::In,
            delta: 2.0,
        })
        .unwrap();
    fx.engine
        .edit(&EditCommand::TrimClip {
            track_id,
            clip_id: id,
            edge: TrimEdge::Out,
            delta: -3.0,
        })
        .unwrap();

    let (_, clip) = fx.engine.timeline().find_clip(id).unwrap();
    assert_eq!(clip.start_time, 2.0);
    assert_eq!(clip.trim_start, 2.0);
    assert_eq!(clip.trim_end, 7.0);
    assert_eq!(clip.duration, 5.0);

    assert!(fx
        .engine
        .edit(&EditCommand::TrimClip {
            track_id,
            clip_id: id,
            edge: TrimEdge::Out,
            delta: 4.0,
        })
        .is_err());
}

#[test]
fn undo_redo_round_trip_through_engine() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 0.0);
    fx.set(TrackKind::Video, id, ClipField::MirrorH(true));

    assert!(fx.engine.undo());
    let (_, clip) = fx.engine.timeline().find_clip(id).unwrap();
    assert!(!clip.mirror_h);

    assert!(fx.engine.undo());
    assert_eq!(fx.engine.timeline().clip_count(), 0);
    assert_eq!(fx.pixel(), BLACK);
    assert!(!fx.engine.undo());

    assert!(fx.engine.redo());
    assert!(fx.engine.redo());
    let (_, clip) = fx.engine.timeline().find_clip(id).unwrap();
    assert!(clip.mirror_h);
    assert_eq!(fx.pixel(), RED);
    assert_eq!(fx.engine.state(), ClockState::Stopped);
}

#[test]
fn still_images_render_for_their_duration() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "still.png", 0.0);

    fx.engine.seek(4.9, fx.at(0.0));
    assert_eq!(fx.pixel(), BLUE);
    fx.engine.seek(5.0, fx.at(0.0));
    assert_eq!(fx.pixel(), BLACK);
}
