//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use splice_core::defaults::{
    MIN_TIMELINE_DURATION, SEEK_EPSILON_SECONDS, STILL_IMAGE_DURATION, SURFACE_HEIGHT, SURFACE_WIDTH,
};
use splice_core::{FrameRate, Result, SpliceError};
use splice_media::{AudioFormat, ExportFormat};

/// Global engine configuration. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Composited raster size.
    pub surface: SurfaceConfig,

    /// Playback timing.
    pub playback: PlaybackConfig,

    /// Master bus and output device.
    pub audio: AudioConfig,

    /// Decoder output settings.
    pub decode: DecodeConfig,

    /// Export defaults.
    pub export: ExportConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Raster surface size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

/// Playback timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Display refresh rate driving the render loop (Hz).
    pub refresh_rate_hz: f64,

    /// Decoders are re-seeked only past this drift (seconds).
    pub seek_epsilon: f64,

    /// Shortest timeline length (seconds).
    pub min_timeline_duration: f64,

    /// Length given to imported stills (seconds).
    pub still_image_duration: f64,

    /// Undo history depth.
    pub history_depth: usize,

    /// Delay before a source that failed to open is tried again (seconds).
    pub open_retry_seconds: f64,
}

/// Master bus and output device parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub master_volume: f64,
    pub master_muted: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decoder output parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Decoded frames are scaled to this size.
    pub width: u32,
    pub height: u32,
    /// Rate at which video sources are sampled.
    pub frame_rate: FrameRate,
}

/// Export defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Preset name: `h264_hd`, `vp9_web` or `prores_422`.
    pub preset: String,

    /// Directory for exports given without a directory.
    pub output_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "splice_engine=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Tag lines with the emitting thread (decoder workers run on their own).
    pub thread_ids: bool,

    /// Include file and line of each event.
    pub source_location: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            playback: PlaybackConfig::default(),
            audio: AudioConfig::default(),
            decode: DecodeConfig::default(),
            export: ExportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: SURFACE_WIDTH,
            height: SURFACE_HEIGHT,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60.0,
            seek_epsilon: SEEK_EPSILON_SECONDS,
            min_timeline_duration: MIN_TIMELINE_DURATION,
            still_image_duration: STILL_IMAGE_DURATION,
            history_depth: 200,
            open_retry_seconds: 1.0,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            master_muted: false,
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            width: SURFACE_WIDTH,
            height: SURFACE_HEIGHT,
            frame_rate: FrameRate::FPS_30,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            preset: "h264_hd".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            thread_ids: false,
            source_location: false,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpliceError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpliceError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SpliceError::Serialization(e.to_string()))
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> {
            Err(SpliceError::Config(msg.into()))
        }

        if self.surface.width == 0 || self.surface.height == 0 {
            return invalid("surface size must be non-zero");
        }
        if self.decode.width == 0 || self.decode.height == 0 {
            return invalid("decode size must be non-zero");
        }
        if self.decode.frame_rate.numerator == 0 || self.decode.frame_rate.denominator == 0 {
            return invalid("decode frame rate must be non-zero");
        }
        let p = &self.playback;
        if !(p.refresh_rate_hz.is_finite() && p.refresh_rate_hz > 0.0) {
            return invalid("refresh_rate_hz must be positive");
        }
        if !(p.seek_epsilon.is_finite() && p.seek_epsilon >= 0.0) {
            return invalid("seek_epsilon must be non-negative");
        }
        if !(p.min_timeline_duration.is_finite() && p.min_timeline_duration > 0.0) {
            return invalid("min_timeline_duration must be positive");
        }
        if !(p.still_image_duration.is_finite() && p.still_image_duration > 0.0) {
            return invalid("still_image_duration must be positive");
        }
        if !(p.open_retry_seconds.is_finite() && p.open_retry_seconds >= 0.0) {
            return invalid("open_retry_seconds must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.audio.master_volume) {
            return invalid("master_volume must be within [0, 1]");
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return invalid("audio sample rate and channels must be non-zero");
        }
        if ExportFormat::preset(&self.export.preset).is_none() {
            return invalid(format!("unknown export preset '{}'", self.export.preset));
        }
        Ok(())
    }

    /// The configured export preset.
    pub fn export_format(&self) -> Result<ExportFormat> {
        ExportFormat::preset(&self.export.preset)
            .ok_or_else(|| SpliceError::Config(format!("unknown export preset '{}'", self.export.preset)))
    }

    /// Output device format.
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
        }
    }
}
