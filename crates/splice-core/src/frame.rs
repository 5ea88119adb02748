//! RGBA8 frame buffers in CPU memory.
//!
//! Decoded source frames and the composited raster share this layout so a
//! blit is a plain row walk and the encoder can stream rows without repacking.

use crate::error::{Result, SpliceError};
use std::sync::Arc;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A packed RGBA8 frame.
///
/// Rows are padded to a 64-byte aligned stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per row (may include padding)
    pub stride: usize,
    /// Pixel data, `stride * height` bytes
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a transparent black frame.
    pub fn new(width: u32, height: u32) -> Self {
        let min_stride = width as usize * BYTES_PER_PIXEL;
        let stride = (min_stride + 63) & !63;
        Self {
            width,
            height,
            stride,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Create a frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height);
        frame.fill(rgba);
        frame
    }

    /// Wrap tightly packed RGBA bytes (`width * height * 4`).
    pub fn from_rgba(width: u32, height: u32, packed: &[u8]) -> Result<Self> {
        let row_len = width as usize * BYTES_PER_PIXEL;
        let expected = row_len * height as usize;
        if packed.len() != expected {
            return Err(SpliceError::InvalidParameter(format!(
                "RGBA payload is {} bytes, expected {} for {}x{}",
                packed.len(),
                expected,
                width,
                height
            )));
        }
        let mut frame = Self::new(width, height);
        if row_len > 0 {
            for (y, src) in packed.chunks_exact(row_len).enumerate() {
                frame.row_mut(y as u32).copy_from_slice(src);
            }
        }
        Ok(frame)
    }

    /// Check for a zero-sized frame.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Get a row of pixel data (without padding).
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// Get a mutable row of pixel data (without padding).
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        &mut self.data[start..end]
    }

    /// Read one pixel.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = x as usize * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }

    /// Fill every pixel with one colour.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for y in 0..self.height {
            for px in self.row_mut(y).chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&rgba);
            }
        }
    }

    /// Copy the pixels into a tightly packed buffer (no stride padding).
    pub fn to_packed_rgba(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * BYTES_PER_PIXEL);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}

/// Arc-wrapped frame buffer for shared ownership between decoder and compositor.
pub type SharedFrameBuffer = Arc<FrameBuffer>;
