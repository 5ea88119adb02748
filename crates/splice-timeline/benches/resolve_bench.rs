use criterion::{black_box, criterion_group, criterion_main, Criterion};
use splice_core::MediaInfo;
use splice_timeline::{resolve, Clip, EditCommand, Timeline};

fn busy_timeline(clips_per_track: usize) -> Timeline {
    let mut timeline = Timeline::with_starter_tracks();
    let track_ids: Vec<_> = timeline.tracks().iter().map(|t| t.id).collect();
    let info = MediaInfo::video(4.0, 1920, 1080);
    for track_id in track_ids {
        for i in 0..clips_per_track {
            let mut clip = Clip::from_media("clip", "clip.mp4", &info);
            clip.start_time = i as f64 * 4.0;
            timeline = timeline.apply(&EditCommand::AddClip { track_id, clip });
        }
    }
    timeline
}

fn bench_resolve(c: &mut Criterion) {
    let timeline = busy_timeline(100);
    c.bench_function("resolve_400_clips", |b| {
        b.iter(|| resolve(black_box(&timeline), black_box(201.5)).visual.len())
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
