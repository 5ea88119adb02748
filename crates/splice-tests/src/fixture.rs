//! Shared engine setup for the integration tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use splice_core::MediaInfo;
use splice_engine::{Engine, EngineConfig, ManualRefresh};
use splice_media::SyntheticProvider;
use splice_timeline::{Clip, ClipId, EditCommand, TrackId, TrackKind};

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 255];

pub struct Fixture {
    pub engine: Engine,
    pub provider: SyntheticProvider,
    pub refresh: ManualRefresh,
    pub t0: Instant,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Like `new`, letting the test adjust the engine config first.
    pub fn with_config(adjust: impl FnOnce(&mut EngineConfig)) -> Self {
        let provider = SyntheticProvider::new();
        provider.register("red.mp4", MediaInfo::video(10.0, 8, 8), RED);
        provider.register("blue.mp4", MediaInfo::video(10.0, 8, 8), BLUE);
        provider.register("still.png", MediaInfo::image(5.0, 8, 8), BLUE);
        provider.register("music.wav", MediaInfo::audio(20.0), [0; 4]);

        let mut config = EngineConfig::default();
        config.surface.width = 8;
        config.surface.height = 8;
        adjust(&mut config);

        let refresh = ManualRefresh::new();
        let engine = Engine::with_cpu_surface(
            config,
            Arc::new(provider.clone()),
            Box::new(refresh.clone()),
        )
        .unwrap();

        Self {
            engine,
            provider,
            refresh,
            t0: Instant::now(),
        }
    }

    pub fn at(&self, secs: f64) -> Instant {
        self.t0 + Duration::from_secs_f64(secs)
    }

    pub fn track(&self, kind: TrackKind) -> TrackId {
        self.engine.timeline().tracks_of(kind).next().unwrap().id
    }

    /// Add a registered source at `start` on the first track of `kind`.
    pub fn place(&mut self, kind: TrackKind, source: &str, start: f64) -> ClipId {
        let info = self.provider_info(source);
        let mut clip = Clip::from_media(source, source, &info);
        clip.start_time = start;
        let track_id = self.track(kind);
        self.engine
            .edit(&EditCommand::AddClip { track_id, clip })
            .unwrap()[0]
    }

    pub fn set(&mut self, kind: TrackKind, clip_id: ClipId, field: splice_timeline::ClipField) {
        let track_id = self.track(kind);
        self.engine
            .edit(&EditCommand::SetClipField {
                track_id,
                clip_id,
                field,
            })
            .unwrap();
    }

    fn provider_info(&self, source: &str) -> MediaInfo {
        use splice_media::DecoderProvider;
        self.provider.probe(source).unwrap()
    }

    /// Deliver refreshes every `step` seconds from `from` through `to`.
    pub fn run(&mut self, from: f64, to: f64, step: f64) {
        let mut t = from;
        while t <= to + 1e-9 {
            self.engine.on_refresh(self.at(t));
            t += step;
        }
    }

    pub fn pixel(&self) -> [u8; 4] {
        self.engine.surface().frame().pixel(4, 4)
    }
}
