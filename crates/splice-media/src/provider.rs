//! The decoder seam.
//!
//! A provider probes and opens sources; each opened handle owns its own
//! buffering (usually a worker thread) and is driven by the tick through a
//! small set of position/playback calls.

use splice_core::{MediaInfo, MediaKind, Result, SharedFrameBuffer};

/// Opens decoders for media sources.
pub trait DecoderProvider: Send + Sync {
    /// Read duration, dimensions and kind without decoding.
    fn probe(&self, source: &str) -> Result<MediaInfo>;

    /// Open a decoder (or still loader) positioned at zero, paused.
    fn open(&self, source: &str, kind: MediaKind) -> Result<Box<dyn DecoderHandle>>;
}

/// A live decoder for one clip.
pub trait DecoderHandle: Send {
    /// Reposition the decoder. Cheap to call; the handle may refill its
    /// buffers asynchronously.
    fn seek(&mut self, position: f64);

    /// Start advancing on the handle's own clock. May be refused with
    /// `SpliceError::PlaybackRejected`.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Whether a frame (or audio) is ready at the current position.
    fn is_presentable(&self) -> bool;

    /// Source position in seconds.
    fn current_position(&self) -> f64;

    /// The frame at the current position, if one is decoded.
    fn current_frame(&mut self) -> Option<SharedFrameBuffer>;

    fn set_volume(&mut self, volume: f64);

    fn volume(&self) -> f64;

    /// Release worker threads and buffers. Further calls are no-ops.
    fn dispose(&mut self);
}
