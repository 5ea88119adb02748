//! The engine: one controller owning the timeline, the clock, the decoder
//! pool and the export job.
//!
//! Every mutation goes through `&mut Engine`. Hosts drive playback by calling
//! [`Engine::on_refresh`] when the scheduler's requested refresh arrives.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use splice_audio::{AudioMixer, MasterBus, MixReport};
use splice_core::{MediaInfo, Result, SpliceError};
use splice_media::{DecoderPool, DecoderProvider, EncodedArtifact, StreamEncoder, VideoFeed};
use splice_render::{ComposeStats, CpuSurface, FrameCompositor, RasterSurface};
use splice_timeline::{resolve, Clip, ClipId, EditCommand, EditError, History, Timeline, Track, TrackId};
use tracing::{debug, info, trace, warn};

use crate::clock::{ClockState, PlaybackClock, TickOutcome};
use crate::config::EngineConfig;
use crate::export::{audio_feeds, ExportJob, ProgressCallback};
use crate::scheduler::{RefreshScheduler, RenderScheduler};

/// Read-only view of the engine for UI subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub current_time: f64,
    pub total_duration: f64,
    pub state: ClockState,
    pub exporting: bool,
    /// Progress of the running export, if any.
    pub export_progress: Option<f64>,
    pub selected: Option<ClipId>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub master: MasterBus,
    pub clip_count: usize,
    /// What the last composite pass drew.
    pub compose: ComposeStats,
    /// Clips audible after the last mixer pass.
    pub audible: usize,
}

/// Timeline playback, preview and export.
pub struct Engine {
    config: EngineConfig,
    timeline: Timeline,
    history: History,
    clock: PlaybackClock,
    pool: DecoderPool,
    compositor: FrameCompositor,
    mixer: AudioMixer,
    surface: Box<dyn RasterSurface>,
    render: RenderScheduler,
    export: Option<ExportJob>,
    export_result: Option<Result<EncodedArtifact>>,
    selected: Option<ClipId>,
    last_mix: MixReport,
}

impl Engine {
    /// Create an engine with an empty starter timeline.
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn DecoderProvider>,
        surface: Box<dyn RasterSurface>,
        scheduler: Box<dyn RefreshScheduler>,
    ) -> Result<Self> {
        config.validate()?;

        let timeline =
            Timeline::with_starter_tracks().with_min_duration(config.playback.min_timeline_duration);
        let clock = PlaybackClock::new(timeline.total_duration());
        let pool = DecoderPool::new(provider)
            .with_seek_epsilon(config.playback.seek_epsilon)
            .with_open_retry(Duration::from_secs_f64(config.playback.open_retry_seconds));
        let mut master = MasterBus {
            volume: 1.0,
            muted: config.audio.master_muted,
        };
        master.set_volume(config.audio.master_volume);

        let (width, height) = surface.size();
        info!("Engine created: surface {}x{}", width, height);

        let mut engine = Self {
            history: History::new(config.playback.history_depth),
            config,
            timeline,
            clock,
            pool,
            compositor: FrameCompositor::new(),
            mixer: AudioMixer::new(master),
            surface,
            render: RenderScheduler::new(scheduler),
            export: None,
            export_result: None,
            selected: None,
            last_mix: MixReport::default(),
        };
        engine.render_frame(false);
        Ok(engine)
    }

    /// Create an engine drawing onto a `CpuSurface` of the configured size.
    pub fn with_cpu_surface(
        config: EngineConfig,
        provider: Arc<dyn DecoderProvider>,
        scheduler: Box<dyn RefreshScheduler>,
    ) -> Result<Self> {
        let surface = CpuSurface::new(config.surface.width, config.surface.height);
        Self::new(config, provider, Box::new(surface), scheduler)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn surface(&self) -> &dyn RasterSurface {
        self.surface.as_ref()
    }

    pub fn pool(&self) -> &DecoderPool {
        &self.pool
    }

    pub fn current_time(&self) -> f64 {
        self.timeline.current_time()
    }

    pub fn state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Apply an edit. Returns the ids of clips it created. A refused edit
    /// leaves the timeline untouched.
    pub fn edit(&mut self, command: &EditCommand) -> std::result::Result<Vec<ClipId>, EditError> {
        let applied = self.timeline.try_apply(command).map_err(|e| {
            debug!("Edit '{}' refused: {}", command.label(), e);
            e
        })?;
        let previous = std::mem::replace(&mut self.timeline, applied.timeline);
        self.history.push(previous);
        debug!("Applied edit '{}'", command.label());
        self.timeline_changed();
        Ok(applied.created)
    }

    /// Place a clip for probed media at time 0 on `track_id`.
    pub fn add_clip(
        &mut self,
        track_id: TrackId,
        name: impl Into<String>,
        source: impl Into<String>,
        info: &MediaInfo,
    ) -> std::result::Result<ClipId, EditError> {
        let created = self.edit(&EditCommand::add_media(track_id, name, source, info))?;
        created
            .first()
            .copied()
            .ok_or_else(|| EditError::InvalidClip("no clip created".into()))
    }

    /// Probe `source` through the decoder provider and add it to `track_id`.
    /// Blocks while probing; async hosts use `driver::probe_media` first.
    pub fn import_media(&mut self, track_id: TrackId, source: &str) -> Result<ClipId> {
        let info = self.pool.provider().probe(source)?;
        let name = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());
        info!("Imported {} ({:?}, {:.2}s)", source, info.kind, info.duration_seconds);
        self.add_clip(track_id, name, source, &info)
            .map_err(|e| SpliceError::InvalidParameter(e.to_string()))
    }

    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) -> std::result::Result<(), EditError> {
        self.edit(&EditCommand::SetTrackMuted { track_id, muted }).map(|_| ())
    }

    pub fn undo(&mut self) -> bool {
        let Some(mut previous) = self.history.undo(&self.timeline) else {
            return false;
        };
        previous.set_current_time(self.timeline.current_time());
        self.timeline = previous;
        debug!("Undo ({} left)", self.history.undo_count());
        self.timeline_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(mut next) = self.history.redo(&self.timeline) else {
            return false;
        };
        next.set_current_time(self.timeline.current_time());
        self.timeline = next;
        debug!("Redo ({} left)", self.history.redo_count());
        self.timeline_changed();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Select a clip, or clear the selection with `None`. Returns false for an
    /// id not on the timeline.
    pub fn select_clip(&mut self, clip_id: Option<ClipId>) -> bool {
        match clip_id {
            Some(id) if self.timeline.find_clip(id).is_none() => false,
            other => {
                self.selected = other;
                true
            }
        }
    }

    /// The selected clip as it is on the current timeline.
    pub fn selected_clip(&self) -> Option<(&Track, &Clip)> {
        self.selected.and_then(|id| self.timeline.find_clip(id))
    }

    fn timeline_changed(&mut self) {
        self.clock.set_total_duration(self.timeline.total_duration());
        if !self.clock.is_playing() {
            self.timeline.set_current_time(self.clock.time());
        }
        self.pool.retain(&self.timeline.clip_ids());
        if let Some(id) = self.selected {
            if self.timeline.find_clip(id).is_none() {
                self.selected = None;
            }
        }
        if !self.clock.is_playing() {
            self.render_frame(false);
        }
    }

    // ── Transport ───────────────────────────────────────────────

    pub fn play(&mut self, now: Instant) {
        if self.export.is_some() {
            warn!("Ignoring play during export");
            return;
        }
        if self.clock.play(now) {
            self.pool.clear_rejections();
            self.render.ensure_running();
            info!("Playback started at {:.3}s", self.clock.time());
        }
    }

    pub fn pause(&mut self) {
        if self.export.is_some() {
            warn!("Ignoring pause during export");
            return;
        }
        if self.clock.pause() {
            self.render.stop();
            self.timeline.set_current_time(self.clock.time());
            info!("Playback paused at {:.3}s", self.clock.time());
            self.render_frame(false);
        }
    }

    /// Move the playhead. While paused the preview is refreshed once; while
    /// playing the next refresh picks the new position up.
    pub fn seek(&mut self, time: f64, now: Instant) {
        if self.export.is_some() {
            warn!("Ignoring seek during export");
            return;
        }
        self.clock.seek(time, now);
        self.timeline.set_current_time(self.clock.time());
        debug!("Seek to {:.3}s", self.clock.time());
        if !self.clock.is_playing() {
            self.render_frame(false);
        }
    }

    /// Handle a display refresh. Only a refresh the engine requested does
    /// anything; others are stale and dropped.
    pub fn on_refresh(&mut self, now: Instant) {
        if self.render.take_pending().is_none() {
            trace!("Dropping unrequested refresh");
            return;
        }

        match self.clock.tick(now) {
            TickOutcome::Advanced(time) => {
                self.timeline.set_current_time(time);
                self.render_frame(true);
                if self.export.is_some() {
                    self.feed_export(time, now);
                }
                if self.clock.is_playing() {
                    self.render.ensure_running();
                }
            }
            TickOutcome::EndOfTimeline => {
                self.timeline.set_current_time(0.0);
                if self.export.is_some() {
                    self.finish_export(now);
                } else {
                    info!("Reached end of timeline");
                    self.render_frame(false);
                }
            }
            TickOutcome::Idle => {}
        }
    }

    // ── Audio ───────────────────────────────────────────────────

    pub fn master(&self) -> MasterBus {
        self.mixer.master
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.mixer.master.set_volume(volume);
        debug!("Master volume {:.2}", self.mixer.master.volume);
        if !self.clock.is_playing() {
            self.render_frame(false);
        }
    }

    pub fn set_master_muted(&mut self, muted: bool) {
        self.mixer.master.muted = muted;
        debug!("Master muted: {}", muted);
        if !self.clock.is_playing() {
            self.render_frame(false);
        }
    }

    // ── Export ──────────────────────────────────────────────────

    /// Start an export. The timeline is replayed from 0 in real time and
    /// every composited frame goes to a session opened on `encoder`. The run
    /// ends on its own at the end of the timeline; collect the outcome with
    /// [`Engine::take_export_result`].
    pub fn export(
        &mut self,
        encoder: &mut dyn StreamEncoder,
        now: Instant,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        if self.export.is_some() {
            warn!("Export requested while one is running");
            return Err(SpliceError::ExportInProgress);
        }

        let total = self.timeline.total_duration();
        let (width, height) = self.surface.size();
        let video = VideoFeed {
            width,
            height,
            duration: total,
        };
        let audio = audio_feeds(&self.timeline, &self.mixer.master);
        info!(
            "Starting export: {}x{}, {:.2}s, {} audio feeds",
            width,
            height,
            total,
            audio.len()
        );

        let mut session = encoder.open(video, audio).map_err(encoder_error)?;
        if let Err(e) = session.start() {
            warn!("Encoder failed to start: {}", e);
            session.abort();
            return Err(encoder_error(e));
        }

        let restore_time = self.timeline.current_time();
        self.export_result = None;
        self.export = Some(ExportJob::new(session, on_progress, restore_time, total));

        self.clock.stop();
        self.timeline.set_current_time(0.0);
        self.pool.clear_rejections();
        self.clock.play(now);
        self.render_frame(true);
        self.feed_export(0.0, now);
        if self.export.is_some() {
            self.render.ensure_running();
        }
        Ok(())
    }

    /// Cancel the running export, discarding its output. Returns false when
    /// nothing was running.
    pub fn abort_export(&mut self, now: Instant) -> bool {
        let Some(job) = self.export.take() else {
            return false;
        };
        let restore_time = job.restore_time;
        job.abort();
        self.export_result = Some(Err(SpliceError::Encoder("export aborted".into())));
        self.end_export(restore_time, now);
        true
    }

    /// Outcome of the last finished export, once.
    pub fn take_export_result(&mut self) -> Option<Result<EncodedArtifact>> {
        self.export_result.take()
    }

    pub fn export_progress(&self) -> Option<f64> {
        self.export.as_ref().map(ExportJob::fraction)
    }

    fn feed_export(&mut self, time: f64, now: Instant) {
        let Some(job) = self.export.as_mut() else {
            return;
        };
        let pushed = job.push(self.surface.frame(), time);
        match pushed {
            Ok(()) => job.report(time),
            Err(e) => {
                warn!("Encoder rejected frame at {:.3}s: {}", time, e);
                if let Some(job) = self.export.take() {
                    let restore_time = job.restore_time;
                    job.abort();
                    self.export_result = Some(Err(encoder_error(e)));
                    self.end_export(restore_time, now);
                }
            }
        }
    }

    fn finish_export(&mut self, now: Instant) {
        let Some(job) = self.export.take() else {
            return;
        };
        let restore_time = job.restore_time;
        let frames = job.frames();
        let result = job.finish().map_err(encoder_error);
        if let Err(e) = &result {
            warn!("Export failed after {} frames: {}", frames, e);
        }
        self.export_result = Some(result);
        self.end_export(restore_time, now);
    }

    fn end_export(&mut self, restore_time: f64, now: Instant) {
        self.render.stop();
        self.clock.stop();
        self.clock.seek(restore_time, now);
        self.timeline.set_current_time(self.clock.time());
        self.render_frame(false);
    }

    // ── Rendering ───────────────────────────────────────────────

    /// Run the compositor and the mixer once at the current time.
    fn render_frame(&mut self, playing: bool) {
        let time = self.timeline.current_time();
        let active = resolve(&self.timeline, time);
        self.compositor
            .compose(self.surface.as_mut(), &active.visual, &mut self.pool, playing);
        self.last_mix = self.mixer.tick(&active.audio, &mut self.pool, playing);

        let live: HashSet<ClipId> = active.ids().collect();
        self.pool.pause_inactive(&live);
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            current_time: self.timeline.current_time(),
            total_duration: self.timeline.total_duration(),
            state: self.clock.state(),
            exporting: self.export.is_some(),
            export_progress: self.export_progress(),
            selected: self.selected,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            master: self.mixer.master,
            clip_count: self.timeline.clip_count(),
            compose: self.compositor.last_stats(),
            audible: self.last_mix.audible.len(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(job) = self.export.take() {
            job.abort();
        }
        self.render.stop();
    }
}

fn encoder_error(e: SpliceError) -> SpliceError {
    match e {
        SpliceError::Encoder(_) => e,
        other => SpliceError::Encoder(other.to_string()),
    }
}
