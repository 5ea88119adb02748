//! Integration tests for the export pipeline.

use std::sync::{Arc, Mutex};

use splice_core::SpliceError;
use splice_engine::{ClockState, ExportProgress};
use splice_media::MemoryEncoder;
use splice_timeline::{ClipField, TrackKind};

use crate::fixture::{Fixture, BLUE, RED};

fn recorder() -> (Arc<Mutex<Vec<ExportProgress>>>, splice_engine::ProgressCallback) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Box::new(move |p| sink.lock().unwrap().push(p)))
}

#[test]
fn progress_is_monotonic_and_ends_at_one() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);
    let mut encoder = MemoryEncoder::new();
    let (seen, on_progress) = recorder();

    fx.engine.export(&mut encoder, fx.at(0.0), on_progress).unwrap();
    // Irregular refresh spacing, including a late one past the end.
    for t in [0.4, 0.9, 3.3, 3.3, 12.0, 12.05, 29.9, 31.0] {
        fx.engine.on_refresh(fx.at(t));
    }

    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 2);
    assert!(seen.windows(2).all(|w| w[0].fraction <= w[1].fraction));
    assert!(seen.iter().all(|p| (0.0..=1.0).contains(&p.fraction)));
    assert_eq!(seen.first().unwrap().fraction, 0.0);
    assert_eq!(seen.last().unwrap().fraction, 1.0);

    let artifact = fx.engine.take_export_result().unwrap().unwrap();
    assert_eq!(artifact.frames_pushed, 8);
}

#[test]
fn frames_carry_timeline_timestamps() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);
    fx.place(TrackKind::Video, "blue.mp4", 10.0);
    let mut encoder = MemoryEncoder::new();

    fx.engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap();
    fx.run(1.0, 12.0, 1.0);

    let recording = encoder.recording();
    assert_eq!(recording.timestamps.first(), Some(&0.0));
    assert!(recording.timestamps.windows(2).all(|w| w[0] < w[1]));
    let last = recording.last_frame.unwrap();
    assert_eq!(last.pixel(4, 4), BLUE);

    let video = recording.video.unwrap();
    assert_eq!((video.width, video.height), (8, 8));
    assert_eq!(video.duration, 30.0);
}

#[test]
fn export_restores_playhead() {
    let mut fx = Fixture::new();
    fx.place(TrackKind::Video, "red.mp4", 0.0);
    fx.engine.seek(6.5, fx.at(0.0));
    let mut encoder = MemoryEncoder::new();

    fx.engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap();
    assert!(fx.engine.snapshot().exporting);
    fx.run(5.0, 30.0, 5.0);

    assert!(!fx.engine.is_exporting());
    assert!(encoder.recording().stopped);
    assert_eq!(fx.engine.current_time(), 6.5);
    assert_eq!(fx.engine.state(), ClockState::Paused);
    assert_eq!(fx.pixel(), RED);
}

#[test]
fn second_export_is_refused() {
    let mut fx = Fixture::new();
    let mut first = MemoryEncoder::new();
    let mut second = MemoryEncoder::new();

    fx.engine
        .export(&mut first, fx.at(0.0), Box::new(|_| {}))
        .unwrap();
    let err = fx
        .engine
        .export(&mut second, fx.at(1.0), Box::new(|_| {}))
        .unwrap_err();
    assert!(matches!(err, SpliceError::ExportInProgress));
    assert!(err.is_user_facing());
    assert!(second.recording().video.is_none());
    assert!(fx.engine.is_exporting());
}

#[test]
fn encoder_start_failure_is_reported() {
    let mut fx = Fixture::new();
    fx.engine.seek(3.0, fx.at(0.0));
    let mut encoder = MemoryEncoder::failing();

    let err = fx
        .engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap_err();
    assert!(matches!(err, SpliceError::Encoder(_)));
    assert!(encoder.recording().aborted);
    assert!(!fx.engine.is_exporting());
    assert_eq!(fx.engine.current_time(), 3.0);
}

#[test]
fn transport_is_ignored_during_export() {
    let mut fx = Fixture::new();
    let mut encoder = MemoryEncoder::new();
    fx.engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap();

    fx.engine.on_refresh(fx.at(1.0));
    fx.engine.pause();
    fx.engine.seek(20.0, fx.at(1.5));
    assert_eq!(fx.engine.state(), ClockState::Playing);
    assert!((fx.engine.current_time() - 1.0).abs() < 1e-6);

    fx.engine.on_refresh(fx.at(2.0));
    assert!((fx.engine.current_time() - 2.0).abs() < 1e-6);
}

#[test]
fn audio_feeds_cover_unmuted_audio_tracks() {
    let mut fx = Fixture::new();
    let music = fx.place(TrackKind::Audio, "music.wav", 2.0);
    fx.set(TrackKind::Audio, music, ClipField::Volume(0.5));
    fx.place(TrackKind::Audio, "red.mp4", 22.0);
    fx.place(TrackKind::Video, "blue.mp4", 0.0);
    fx.engine.set_master_volume(0.8);

    let mut encoder = MemoryEncoder::new();
    fx.engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap();

    let feeds = encoder.recording().audio;
    assert_eq!(feeds.len(), 2);
    assert_eq!(feeds[0].clip_id, music);
    assert_eq!(feeds[0].timeline_start, 2.0);
    assert!((feeds[0].gain - 0.4).abs() < 1e-9);
    assert_eq!(feeds[1].source, "red.mp4");
    assert!(feeds.iter().all(|f| f.source != "blue.mp4"));
}

#[test]
fn abort_discards_output() {
    let mut fx = Fixture::new();
    let mut encoder = MemoryEncoder::new();
    fx.engine
        .export(&mut encoder, fx.at(0.0), Box::new(|_| {}))
        .unwrap();
    fx.run(1.0, 3.0, 1.0);

    assert!(fx.engine.abort_export(fx.at(3.5)));
    let recording = encoder.recording();
    assert!(recording.aborted);
    assert!(!recording.stopped);
    assert!(recording.timestamps.is_empty());
    assert!(matches!(
        fx.engine.take_export_result(),
        Some(Err(SpliceError::Encoder(_)))
    ));
    assert_eq!(fx.engine.state(), ClockState::Stopped);
}
