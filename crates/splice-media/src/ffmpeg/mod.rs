//! FFmpeg-backed decoding, probing and encoding.
//!
//! FFmpeg runs as a child process located through ffmpeg-sidecar. Decoders
//! read raw RGBA frames or f32 PCM from the child's stdout on worker threads.

mod audio;
mod encode;
mod probe;
mod video;

pub use encode::FfmpegEncoder;
pub use probe::parse_probe_json;

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use splice_core::defaults::{STILL_IMAGE_DURATION, SURFACE_HEIGHT, SURFACE_WIDTH};
use splice_core::{FrameRate, MediaInfo, MediaKind, Result};
use tracing::{debug, info};

use crate::output::AudioBus;
use crate::provider::{DecoderHandle, DecoderProvider};

pub(crate) fn ffmpeg_path() -> PathBuf {
    ffmpeg_sidecar::paths::ffmpeg_path()
}

pub(crate) fn ffprobe_path() -> PathBuf {
    let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
    ffmpeg_path().with_file_name(name)
}

/// A quiet ffmpeg command with piped stdout.
pub(crate) fn ffmpeg_reader(args: &[String]) -> Command {
    let mut cmd = Command::new(ffmpeg_path());
    cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"])
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    cmd
}

/// Wall-clock position shared by the FFmpeg handles.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Playhead {
    from: f64,
    anchor: Option<Instant>,
    duration: f64,
}

impl Playhead {
    pub(crate) fn new(duration: f64) -> Self {
        Self {
            from: 0.0,
            anchor: None,
            duration: duration.max(0.0),
        }
    }

    pub(crate) fn position(&self) -> f64 {
        let pos = match self.anchor {
            Some(anchor) => self.from + anchor.elapsed().as_secs_f64(),
            None => self.from,
        };
        pos.min(self.duration)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub(crate) fn run(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
    }

    pub(crate) fn halt(&mut self) {
        self.from = self.position();
        self.anchor = None;
    }

    pub(crate) fn seek(&mut self, position: f64) {
        self.from = position.clamp(0.0, self.duration);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }
}

/// Decoder provider running FFmpeg child processes.
///
/// `probe` results are cached per source. `open` runs on the render tick and
/// never probes; a source opened before it was probed gets an unbounded
/// playhead.
#[derive(Clone)]
pub struct FfmpegProvider {
    decode_width: u32,
    decode_height: u32,
    frame_rate: FrameRate,
    still_duration: f64,
    audio: Option<AudioBus>,
    probed: Arc<Mutex<HashMap<String, MediaInfo>>>,
}

impl FfmpegProvider {
    pub fn new() -> Self {
        Self {
            decode_width: SURFACE_WIDTH,
            decode_height: SURFACE_HEIGHT,
            frame_rate: FrameRate::FPS_30,
            still_duration: STILL_IMAGE_DURATION,
            audio: None,
            probed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Source length from an earlier probe.
    pub fn probed_duration(&self, source: &str) -> Option<f64> {
        self.probed.lock().get(source).map(|info| info.duration_seconds)
    }

    fn remember(&self, source: &str, info: &MediaInfo) {
        self.probed.lock().insert(source.to_string(), info.clone());
    }

    /// Frames are scaled to this size while decoding.
    pub fn with_decode_size(mut self, width: u32, height: u32) -> Self {
        self.decode_width = width.max(1);
        self.decode_height = height.max(1);
        self
    }

    /// Rate at which video sources are sampled.
    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Timeline length reported for still images.
    pub fn with_still_duration(mut self, seconds: f64) -> Self {
        self.still_duration = seconds;
        self
    }

    /// Route decoded audio to `bus`. Without a bus audio handles only keep
    /// time.
    pub fn with_audio_bus(mut self, bus: AudioBus) -> Self {
        self.audio = Some(bus);
        self
    }
}

impl Default for FfmpegProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderProvider for FfmpegProvider {
    fn probe(&self, source: &str) -> Result<MediaInfo> {
        let info = probe::probe_source(source, self.still_duration)?;
        self.remember(source, &info);
        Ok(info)
    }

    fn open(&self, source: &str, kind: MediaKind) -> Result<Box<dyn DecoderHandle>> {
        let duration = self.probed_duration(source).unwrap_or_else(|| {
            debug!("{} was not probed, opening without a duration", source);
            f64::INFINITY
        });
        info!("Opening {:?} decoder for {}", kind, source);
        let size = (self.decode_width, self.decode_height);
        Ok(match kind {
            MediaKind::Video => Box::new(video::VideoHandle::open(source, size, self.frame_rate, duration)),
            MediaKind::Image => Box::new(video::StillHandle::open(source, size, duration)),
            MediaKind::Audio => Box::new(audio::AudioHandle::open(source, duration, self.audio.clone())),
        })
    }
}
