//! Raster surfaces.

use glam::Vec2;
use rayon::prelude::*;
use splice_core::defaults::{SURFACE_HEIGHT, SURFACE_WIDTH};
use splice_core::frame::BYTES_PER_PIXEL;
use splice_core::{BlitTransform, FrameBuffer, Result, SpliceError};

/// A drawing target.
pub trait RasterSurface: Send {
    /// Logical size in pixels.
    fn size(&self) -> (u32, u32);

    /// Fill with opaque black.
    fn clear(&mut self);

    /// Global alpha applied to subsequent blits.
    fn alpha(&self) -> f32;

    fn set_alpha(&mut self, alpha: f32);

    /// Draw `frame` scaled to the full surface extent through `transform`.
    fn blit(&mut self, frame: &FrameBuffer, transform: &BlitTransform) -> Result<()>;

    /// The current contents.
    fn frame(&self) -> &FrameBuffer;
}

/// An RGBA8 surface in system memory.
#[derive(Debug, Clone)]
pub struct CpuSurface {
    target: FrameBuffer,
    alpha: f32,
}

impl CpuSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: FrameBuffer::solid(width, height, [0, 0, 0, 255]),
            alpha: 1.0,
        }
    }
}

impl Default for CpuSurface {
    fn default() -> Self {
        Self::new(SURFACE_WIDTH, SURFACE_HEIGHT)
    }
}

/// For each destination index, the source index sampled (nearest neighbour).
fn sample_map(dst_len: u32, src_len: u32, to_draw: impl Fn(f32) -> f32) -> Vec<usize> {
    let scale = src_len as f32 / dst_len as f32;
    (0..dst_len)
        .map(|d| {
            let draw = to_draw(d as f32 + 0.5);
            ((draw * scale).floor().max(0.0) as usize).min(src_len as usize - 1)
        })
        .collect()
}

#[inline]
fn over(src: u8, dst: u8, alpha: f32) -> u8 {
    (src as f32 * alpha + dst as f32 * (1.0 - alpha) + 0.5) as u8
}

impl RasterSurface for CpuSurface {
    fn size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    fn clear(&mut self) {
        self.target.fill([0, 0, 0, 255]);
    }

    fn alpha(&self) -> f32 {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    }

    fn blit(&mut self, frame: &FrameBuffer, transform: &BlitTransform) -> Result<()> {
        if frame.is_empty() {
            return Err(SpliceError::InvalidParameter("cannot blit an empty frame".into()));
        }
        let (width, height) = self.size();
        if width == 0 || height == 0 || self.alpha <= 0.0 {
            return Ok(());
        }

        // Mirroring is axis aligned, so rows and columns map independently
        let t = *transform;
        let cols = sample_map(width, frame.width, |x| t.surface_to_draw(Vec2::new(x, 0.5)).x);
        let rows = sample_map(height, frame.height, |y| t.surface_to_draw(Vec2::new(0.5, y)).y);

        let global = self.alpha;
        let stride = self.target.stride;
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        self.target
            .data
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, dst_row)| {
                let src_row = frame.row(rows[y] as u32);
                for (x, dst) in dst_row[..row_bytes].chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                    let s = cols[x] * BYTES_PER_PIXEL;
                    let src = &src_row[s..s + BYTES_PER_PIXEL];
                    let a = src[3] as f32 / 255.0 * global;
                    dst[0] = over(src[0], dst[0], a);
                    dst[1] = over(src[1], dst[1], a);
                    dst[2] = over(src[2], dst[2], a);
                    dst[3] = 255;
                }
            });
        Ok(())
    }

    fn frame(&self) -> &FrameBuffer {
        &self.target
    }
}
