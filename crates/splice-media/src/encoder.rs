//! The stream encoder seam used by export.
//!
//! Export opens one session per run, pushes every composited frame with its
//! timeline timestamp and either stops the session (collecting the artifact)
//! or aborts it, discarding partial output.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use splice_core::{FrameBuffer, FrameRate, Result, SpliceError};
use splice_timeline::ClipId;
use tracing::{debug, info};

// ── Format presets ──────────────────────────────────────────────

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    Vp9,
    ProRes422,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
            Self::ProRes422 => "prores_ks",
        }
    }

    /// Container extension for this codec.
    pub fn extension(self) -> &'static str {
        match self {
            Self::H264 => "mp4",
            Self::Vp9 => "webm",
            Self::ProRes422 => "mov",
        }
    }

    /// Output pixel format.
    pub fn pixel_format(self) -> &'static str {
        match self {
            Self::ProRes422 => "yuv422p10le",
            Self::H264 | Self::Vp9 => "yuv420p",
        }
    }
}

/// Audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    Opus,
    Pcm,
}

impl AudioCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "libopus",
            Self::Pcm => "pcm_s16le",
        }
    }
}

/// Encoding settings for an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFormat {
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    /// Output frame rate; the tick feed is resampled to it.
    pub frame_rate: FrameRate,
    /// CRF value (lower = better) for codecs that support it.
    pub crf: Option<u32>,
    /// Bitrate in kbps (overrides CRF if set).
    pub video_bitrate: Option<u32>,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    pub audio_sample_rate: u32,
}

impl ExportFormat {
    /// H.264 / AAC in MP4.
    pub fn h264_hd() -> Self {
        Self {
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            frame_rate: FrameRate::FPS_30,
            crf: Some(18),
            video_bitrate: None,
            audio_bitrate: 192,
            audio_sample_rate: 48_000,
        }
    }

    /// VP9 / Opus in WebM.
    pub fn vp9_web() -> Self {
        Self {
            video_codec: VideoCodec::Vp9,
            audio_codec: AudioCodec::Opus,
            frame_rate: FrameRate::FPS_30,
            crf: Some(30),
            video_bitrate: None,
            audio_bitrate: 128,
            audio_sample_rate: 48_000,
        }
    }

    /// ProRes 422 / PCM in MOV for mastering.
    pub fn prores_422() -> Self {
        Self {
            video_codec: VideoCodec::ProRes422,
            audio_codec: AudioCodec::Pcm,
            frame_rate: FrameRate::FPS_30,
            crf: None,
            video_bitrate: None,
            audio_bitrate: 1536,
            audio_sample_rate: 48_000,
        }
    }

    /// Look a preset up by name (`h264_hd`, `vp9_web`, `prores_422`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "h264_hd" => Some(Self::h264_hd()),
            "vp9_web" => Some(Self::vp9_web()),
            "prores_422" => Some(Self::prores_422()),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.video_codec.extension()
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::h264_hd()
    }
}

// ── Feeds and artifacts ─────────────────────────────────────────

/// The composited video stream handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFeed {
    pub width: u32,
    pub height: u32,
    /// Expected length of the run in seconds.
    pub duration: f64,
}

/// One clip's contribution to the exported audio mix.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeed {
    pub clip_id: ClipId,
    pub source: String,
    /// Where the clip starts on the timeline.
    pub timeline_start: f64,
    /// Source in point.
    pub source_start: f64,
    pub duration: f64,
    /// Clip volume times master volume.
    pub gain: f64,
    pub reversed: bool,
}

/// What a finished encoder session produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedArtifact {
    /// Output file, for encoders that write one.
    pub path: Option<PathBuf>,
    /// Frames received through `push_frame`.
    pub frames_pushed: u64,
    /// Frames written to the output stream after rate conversion.
    pub frames_written: u64,
    /// Encoded length in seconds.
    pub duration: f64,
    /// Size of the output in bytes.
    pub bytes: u64,
}

// ── Traits ──────────────────────────────────────────────────────

/// Opens encoder sessions.
pub trait StreamEncoder: Send {
    fn open(&mut self, video: VideoFeed, audio: Vec<AudioFeed>) -> Result<Box<dyn EncoderSession>>;
}

/// A single encoding run.
pub trait EncoderSession: Send {
    /// Begin accepting frames.
    fn start(&mut self) -> Result<()>;

    /// Append a composited frame presented at `timestamp` seconds.
    fn push_frame(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()>;

    /// Finish the stream and collect the result.
    fn stop(self: Box<Self>) -> Result<EncodedArtifact>;

    /// Tear down, discarding everything written so far.
    fn abort(self: Box<Self>);
}

// ── In-memory encoder ───────────────────────────────────────────

/// Everything a `MemoryEncoder` session received.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecording {
    pub video: Option<VideoFeed>,
    pub audio: Vec<AudioFeed>,
    pub started: bool,
    pub stopped: bool,
    pub aborted: bool,
    /// Timestamps of every pushed frame, in push order.
    pub timestamps: Vec<f64>,
    pub last_frame: Option<FrameBuffer>,
}

/// An encoder that records frames in memory. Used by tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryEncoder {
    recording: Arc<Mutex<MemoryRecording>>,
    fail_start: bool,
}

impl MemoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An encoder whose sessions refuse to start.
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Snapshot of what the last session received.
    pub fn recording(&self) -> MemoryRecording {
        self.recording.lock().clone()
    }
}

impl StreamEncoder for MemoryEncoder {
    fn open(&mut self, video: VideoFeed, audio: Vec<AudioFeed>) -> Result<Box<dyn EncoderSession>> {
        *self.recording.lock() = MemoryRecording {
            video: Some(video),
            audio,
            ..MemoryRecording::default()
        };
        Ok(Box::new(MemorySession {
            recording: self.recording.clone(),
            fail_start: self.fail_start,
            bytes: 0,
        }))
    }
}

struct MemorySession {
    recording: Arc<Mutex<MemoryRecording>>,
    fail_start: bool,
    bytes: u64,
}

impl EncoderSession for MemorySession {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(SpliceError::Encoder("memory encoder configured to fail".into()));
        }
        self.recording.lock().started = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer, timestamp: f64) -> Result<()> {
        let mut recording = self.recording.lock();
        if !recording.started {
            return Err(SpliceError::Encoder("session not started".into()));
        }
        recording.timestamps.push(timestamp);
        recording.last_frame = Some(frame.clone());
        self.bytes += (frame.width as u64) * (frame.height as u64) * 4;
        Ok(())
    }

    fn stop(self: Box<Self>) -> Result<EncodedArtifact> {
        let mut recording = self.recording.lock();
        recording.stopped = true;
        let frames = recording.timestamps.len() as u64;
        let duration = recording.timestamps.last().copied().unwrap_or(0.0);
        info!("Memory encoder stopped after {} frames", frames);
        Ok(EncodedArtifact {
            path: None,
            frames_pushed: frames,
            frames_written: frames,
            duration,
            bytes: self.bytes,
        })
    }

    fn abort(self: Box<Self>) {
        let mut recording = self.recording.lock();
        recording.aborted = true;
        recording.timestamps.clear();
        recording.last_frame = None;
        debug!("Memory encoder session aborted");
    }
}
