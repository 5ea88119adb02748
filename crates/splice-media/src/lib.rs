//! Splice Media - Decoding, encoding and audio output
//!
//! This crate handles:
//! - The decoder provider / handle seam and the per-clip decoder pool
//! - The stream encoder seam used by export
//! - FFmpeg-backed decoders, probing and encoding
//! - Deterministic in-memory collaborators for tests
//! - Real-time audio output via cpal

pub mod encoder;
pub mod ffmpeg;
pub mod output;
pub mod pool;
pub mod provider;
pub mod ring_buffer;
pub mod synthetic;

pub use encoder::{
    AudioCodec, AudioFeed, EncodedArtifact, EncoderSession, ExportFormat, MemoryEncoder,
    MemoryRecording, StreamEncoder, VideoCodec, VideoFeed,
};
pub use ffmpeg::{FfmpegEncoder, FfmpegProvider};
pub use output::{AudioBus, AudioFormat, AudioOutput};
pub use pool::DecoderPool;
pub use provider::{DecoderHandle, DecoderProvider};
pub use ring_buffer::RingBuffer;
pub use synthetic::{SyntheticHandleState, SyntheticProvider};

/// Whether the FFmpeg executables are reachable.
pub fn ffmpeg_available() -> bool {
    let available = ffmpeg_sidecar::command::ffmpeg_is_installed();
    tracing::info!("FFmpeg available: {}", available);
    available
}
