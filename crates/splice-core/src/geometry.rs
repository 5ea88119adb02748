//! 2D transforms applied when a clip is blitted onto the raster surface.

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

/// Mirror flags of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mirror {
    /// Flip left/right.
    pub horizontal: bool,
    /// Flip top/bottom.
    pub vertical: bool,
}

impl Mirror {
    pub const NONE: Self = Self {
        horizontal: false,
        vertical: false,
    };

    /// Create mirror flags.
    pub const fn new(horizontal: bool, vertical: bool) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// Transform for a full-extent blit: mirror flags plus the surface size
/// they are anchored to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlitTransform {
    pub mirror: Mirror,
    /// Surface width in pixels
    pub width: f32,
    /// Surface height in pixels
    pub height: f32,
}

impl BlitTransform {
    /// Create a transform for a surface of the given size.
    pub fn new(mirror: Mirror, width: u32, height: u32) -> Self {
        Self {
            mirror,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Draw-space to surface-space matrix.
    ///
    /// Horizontal mirroring is `translate(width, 0) * scale(-1, 1)`, vertical
    /// mirroring is `translate(0, height) * scale(1, -1)`, applied in that order.
    pub fn to_affine(self) -> Affine2 {
        let mut m = Affine2::IDENTITY;
        if self.mirror.horizontal {
            m = m
                * Affine2::from_translation(Vec2::new(self.width, 0.0))
                * Affine2::from_scale(Vec2::new(-1.0, 1.0));
        }
        if self.mirror.vertical {
            m = m
                * Affine2::from_translation(Vec2::new(0.0, self.height))
                * Affine2::from_scale(Vec2::new(1.0, -1.0));
        }
        m
    }

    /// Map a surface point back into draw space.
    pub fn surface_to_draw(self, point: Vec2) -> Vec2 {
        self.to_affine().inverse().transform_point2(point)
    }
}
