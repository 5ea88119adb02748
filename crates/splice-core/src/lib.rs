//! Splice Core - Foundation types for the timeline engine
//!
//! This crate provides the types shared by every other Splice crate:
//! - Error taxonomy (`SpliceError`)
//! - RGBA frame buffers used for decoded frames and the composited raster
//! - Blit transforms (mirror + opacity)
//! - Time spans and frame rates
//! - Media descriptions returned by probing

pub mod error;
pub mod frame;
pub mod geometry;
pub mod media;
pub mod time;

pub use error::{Result, SpliceError};
pub use frame::{FrameBuffer, SharedFrameBuffer};
pub use geometry::{BlitTransform, Mirror};
pub use media::{MediaInfo, MediaKind};
pub use time::{FrameRate, TimeSpan};

/// Engine-wide defaults shared by the model, the pool and the compositor.
pub mod defaults {
    /// A timeline is never shorter than this, even when empty (seconds).
    pub const MIN_TIMELINE_DURATION: f64 = 30.0;

    /// Decoders are only re-seeked when they drift further than this (seconds).
    pub const SEEK_EPSILON_SECONDS: f64 = 0.1;

    /// Logical raster resolution of the composited output.
    pub const SURFACE_WIDTH: u32 = 1920;
    pub const SURFACE_HEIGHT: u32 = 1080;

    /// Timeline length given to still images on import (seconds).
    pub const STILL_IMAGE_DURATION: f64 = 5.0;

    /// Decoded frames buffered ahead of the playhead per video handle.
    pub const LOOKAHEAD_FRAMES: usize = 8;
}
