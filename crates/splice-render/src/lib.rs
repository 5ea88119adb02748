//! Splice Render - Frame compositing
//!
//! - `RasterSurface`: the drawing target the compositor blits onto
//! - `CpuSurface`: an RGBA8 surface in system memory
//! - `FrameCompositor`: draws the live visual clips in track order

pub mod compositor;
pub mod surface;

pub use compositor::{ComposeStats, FrameCompositor};
pub use surface::{CpuSurface, RasterSurface};
