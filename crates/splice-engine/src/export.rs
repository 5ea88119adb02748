//! Export job bookkeeping.
//!
//! An export replays the timeline in real time through the normal tick and
//! feeds every composited frame to an encoder session. This module holds
//! the session, progress reporting and the audio feed list; the tick itself
//! lives in the engine.

use std::time::Instant;

use splice_audio::{effective_volume, MasterBus};
use splice_core::{FrameBuffer, MediaKind, Result};
use splice_media::{AudioFeed, EncodedArtifact, EncoderSession};
use splice_timeline::{Timeline, TrackKind};
use tracing::{debug, info, warn};

/// Progress of a running export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportProgress {
    /// Completed share in [0, 1]. Never decreases during a run.
    pub fraction: f64,
    /// Timeline seconds rendered so far.
    pub elapsed: f64,
    /// Timeline length being exported.
    pub total: f64,
    /// Frames handed to the encoder.
    pub frames: u64,
}

/// Receives progress updates.
pub type ProgressCallback = Box<dyn FnMut(ExportProgress) + Send>;

/// A running export.
pub(crate) struct ExportJob {
    session: Box<dyn EncoderSession>,
    on_progress: ProgressCallback,
    /// Current time to go back to when the run ends.
    pub(crate) restore_time: f64,
    total: f64,
    fraction: f64,
    frames: u64,
    started: Instant,
}

impl ExportJob {
    pub(crate) fn new(
        session: Box<dyn EncoderSession>,
        on_progress: ProgressCallback,
        restore_time: f64,
        total: f64,
    ) -> Self {
        Self {
            session,
            on_progress,
            restore_time,
            total,
            fraction: 0.0,
            frames: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn fraction(&self) -> f64 {
        self.fraction
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    /// Hand one composited frame to the encoder.
    pub(crate) fn push(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()> {
        self.session.push_frame(frame, timestamp)?;
        self.frames += 1;
        Ok(())
    }

    /// Report progress at `elapsed` timeline seconds.
    pub(crate) fn report(&mut self, elapsed: f64) {
        let raw = if self.total > 0.0 { elapsed / self.total } else { 1.0 };
        let fraction = raw.clamp(0.0, 1.0).max(self.fraction);
        self.fraction = fraction;
        (self.on_progress)(ExportProgress {
            fraction,
            elapsed: elapsed.clamp(0.0, self.total),
            total: self.total,
            frames: self.frames,
        });
    }

    /// Stop the encoder and collect its output. A successful run reports
    /// exactly 1.0 last.
    pub(crate) fn finish(mut self) -> Result<EncodedArtifact> {
        let frames = self.frames;
        let total = self.total;
        let wall = self.started.elapsed().as_secs_f64();
        let mut on_progress = std::mem::replace(&mut self.on_progress, Box::new(|_| {}));

        let artifact = self.session.stop()?;
        on_progress(ExportProgress {
            fraction: 1.0,
            elapsed: total,
            total,
            frames,
        });
        info!(
            "Export finished: {} frames, {:.2}s of timeline in {:.2}s",
            frames, total, wall
        );
        Ok(artifact)
    }

    /// Discard the run and its partial output.
    pub(crate) fn abort(self) {
        warn!("Export aborted after {} frames", self.frames);
        self.session.abort();
    }
}

impl std::fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportJob")
            .field("restore_time", &self.restore_time)
            .field("total", &self.total)
            .field("fraction", &self.fraction)
            .field("frames", &self.frames)
            .finish()
    }
}

/// One audio feed per audible clip on every unmuted audio track.
///
/// Video clips placed on audio tracks contribute their sound. Embedded audio
/// of clips on video tracks is not exported, matching preview.
pub fn audio_feeds(timeline: &Timeline, master: &MasterBus) -> Vec<AudioFeed> {
    let mut feeds = Vec::new();
    for track in timeline.tracks_of(TrackKind::Audio) {
        if track.muted {
            continue;
        }
        for clip in &track.clips {
            if !matches!(clip.kind, MediaKind::Audio | MediaKind::Video) {
                continue;
            }
            let gain = effective_volume(clip.volume, track.muted, master);
            if gain <= 0.0 {
                debug!("Clip {} is silent; no audio feed", clip.id);
                continue;
            }
            feeds.push(AudioFeed {
                clip_id: clip.id,
                source: clip.source.clone(),
                timeline_start: clip.start_time,
                source_start: clip.trim_start,
                duration: clip.duration,
                gain,
                reversed: clip.reversed,
            });
        }
    }
    feeds
}
