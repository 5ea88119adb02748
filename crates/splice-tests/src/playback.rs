//! Integration tests for playback: clock, compositor and mixer driven
//! through `Engine::on_refresh` with simulated time.

use splice_core::{MediaInfo, MediaKind};
use splice_engine::ClockState;
use splice_timeline::{Clip, ClipField, EditCommand, TrackKind, TrimEdge};

use crate::fixture::{Fixture, BLACK, RED};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ── Clock ──────────────────────────────────────────────────────

#[test]
fn seek_while_playing_continues_from_new_position() {
    let mut fx = Fixture::new();
    fx.engine.play(fx.at(0.0));
    fx.run(1.0, 2.0, 1.0);
    assert!(close(fx.engine.current_time(), 2.0));

    fx.engine.seek(10.0, fx.at(2.0));
    fx.engine.on_refresh(fx.at(4.0));
    assert!(close(fx.engine.current_time(), 12.0));
    assert_eq!(fx.engine.state(), ClockState::Playing);
}

#[test]
fn end_of_timeline_wraps_to_zero() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 25.0);
    assert_eq!(fx.engine.timeline().total_duration(), 35.0);

    fx.engine.seek(34.0, fx.at(0.0));
    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    assert!(close(fx.engine.current_time(), 34.5));
    assert_eq!(fx.pixel(), RED);
    assert!(fx.engine.pool().is_playing(id));

    fx.engine.on_refresh(fx.at(1.5));
    assert_eq!(fx.engine.state(), ClockState::Stopped);
    assert_eq!(fx.engine.current_time(), 0.0);
    assert!(!fx.engine.pool().is_playing(id));
    assert_eq!(fx.pixel(), BLACK);

    // The loop stopped; further refreshes are dropped.
    fx.engine.on_refresh(fx.at(2.0));
    assert_eq!(fx.engine.current_time(), 0.0);
}

#[test]
fn pause_freezes_and_refreshes_preview_once() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 0.0);
    fx.engine.play(fx.at(0.0));
    fx.run(0.5, 2.0, 0.5);
    assert!(fx.engine.pool().is_playing(id));

    fx.engine.pause();
    assert_eq!(fx.engine.state(), ClockState::Paused);
    assert!(close(fx.engine.current_time(), 2.0));
    assert!(!fx.engine.pool().is_playing(id));
    let position = fx.provider.state("red.mp4").unwrap().position;
    assert!(close(position, 2.0));
}

// ── Decoders ───────────────────────────────────────────────────

#[test]
fn reversed_clip_is_positioned_by_seek_only() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Video, "red.mp4", 0.0);
    let track_id = fx.track(TrackKind::Video);
    for (edge, delta) in [(TrimEdge::In, 1.0), (TrimEdge::Out, -6.0)] {
        fx.engine
            .edit(&EditCommand::TrimClip {
                track_id,
                clip_id: id,
                edge,
                delta,
            })
            .unwrap();
    }
    fx.set(TrackKind::Video, id, ClipField::Reversed(true));

    for (t, offset) in [(1.0, 4.0), (2.5, 2.5), (3.999, 1.001)] {
        fx.engine.seek(t, fx.at(0.0));
        let position = fx.provider.state("red.mp4").unwrap().position;
        assert!(close(position, offset), "at {t}: {position}");
    }

    fx.engine.seek(1.0, fx.at(0.0));
    fx.engine.play(fx.at(0.0));
    fx.run(0.5, 2.0, 0.5);
    let state = fx.provider.state("red.mp4").unwrap();
    assert!(!state.playing);
    assert_eq!(state.play_attempts, 0);
    assert!(close(state.position, 2.0));
    assert_eq!(fx.pixel(), RED);
}

#[test]
fn rejected_playback_is_skipped_until_next_play() {
    let mut fx = Fixture::new();
    fx.provider.reject_play("red.mp4");
    let id = fx.place(TrackKind::Video, "red.mp4", 0.0);

    fx.engine.play(fx.at(0.0));
    fx.run(0.5, 1.5, 0.5);
    let state = fx.provider.state("red.mp4").unwrap();
    assert_eq!(state.play_attempts, 1);
    assert!(!state.playing);
    assert!(fx.engine.pool().is_rejected(id));
    assert_eq!(fx.pixel(), BLACK);
    assert_eq!(fx.engine.snapshot().compose.skipped, 1);

    fx.engine.pause();
    fx.engine.play(fx.at(2.0));
    fx.engine.on_refresh(fx.at(2.5));
    assert_eq!(fx.provider.state("red.mp4").unwrap().play_attempts, 2);
}

#[test]
fn unopenable_source_is_skipped() {
    let mut fx = Fixture::new();
    let clip = Clip::from_media("ghost", "missing.mp4", &MediaInfo::video(5.0, 8, 8));
    let track_id = fx.track(TrackKind::Video);
    fx.engine.edit(&EditCommand::AddClip { track_id, clip }).unwrap();

    fx.engine.play(fx.at(0.0));
    fx.run(0.5, 1.0, 0.5);
    assert_eq!(fx.pixel(), BLACK);
    assert_eq!(fx.engine.snapshot().compose.skipped, 1);
    assert!(fx.engine.pool().is_empty());
}

#[test]
fn source_appearing_later_is_drawn() {
    let mut fx = Fixture::with_config(|config| config.playback.open_retry_seconds = 0.0);
    let clip = Clip::from_media("late", "late.mp4", &MediaInfo::video(5.0, 8, 8));
    let track_id = fx.track(TrackKind::Video);
    fx.engine.edit(&EditCommand::AddClip { track_id, clip }).unwrap();

    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    assert_eq!(fx.pixel(), BLACK);

    fx.provider.register("late.mp4", MediaInfo::video(5.0, 8, 8), RED);
    fx.engine.on_refresh(fx.at(1.0));
    assert_eq!(fx.pixel(), RED);
    assert_eq!(fx.engine.pool().len(), 1);
}

// ── Audio ──────────────────────────────────────────────────────

#[test]
fn clip_and_master_gain_multiply() {
    let mut fx = Fixture::new();
    let id = fx.place(TrackKind::Audio, "music.wav", 0.0);
    fx.set(TrackKind::Audio, id, ClipField::Volume(0.5));
    fx.engine.set_master_volume(0.8);

    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    let state = fx.provider.state("music.wav").unwrap();
    assert!(close(state.volume, 0.4));
    assert!(state.playing);
    assert_eq!(fx.engine.snapshot().audible, 1);

    fx.engine.set_master_muted(true);
    fx.engine.on_refresh(fx.at(1.0));
    let state = fx.provider.state("music.wav").unwrap();
    assert_eq!(state.volume, 0.0);
    assert!(!state.playing);
    assert_eq!(fx.engine.snapshot().audible, 0);
}

#[test]
fn muted_track_silences_its_clips() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Audio, "music.wav", 0.0);
    fx.engine
        .set_track_muted(fx.track(TrackKind::Audio), true)
        .unwrap();

    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    let state = fx.provider.state("music.wav").unwrap();
    assert_eq!(state.volume, 0.0);
    assert!(!state.playing);
}

#[test]
fn video_clip_on_audio_track_is_heard_not_seen() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Audio, "red.mp4", 0.0);

    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    let state = fx.provider.state("red.mp4").unwrap();
    assert_eq!(state.kind, MediaKind::Audio);
    assert!(state.playing);
    assert_eq!(fx.pixel(), BLACK);
}

#[test]
fn video_track_audio_is_not_mixed() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);

    fx.engine.play(fx.at(0.0));
    fx.engine.on_refresh(fx.at(0.5));
    assert_eq!(fx.provider.states("red.mp4").len(), 1);
    assert_eq!(fx.provider.state("red.mp4").unwrap().kind, MediaKind::Video);
    assert_eq!(fx.engine.snapshot().audible, 0);
}
