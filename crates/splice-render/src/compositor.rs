//! Frame compositor: draws the live visual clips onto a raster surface.
//!
//! Clips are drawn in resolver order (track declaration order, then clip
//! order), so later tracks land on top. Each clip's decoder is positioned
//! before its frame is read; a clip without a presentable frame, or whose
//! blit fails, is skipped for this frame only.

use splice_core::BlitTransform;
use splice_media::DecoderPool;
use splice_timeline::{ClipId, ResolvedClip};
use tracing::{trace, warn};

use crate::surface::RasterSurface;

/// What one composite pass drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeStats {
    pub drawn: usize,
    pub skipped: usize,
}

/// Composites visual clips each tick.
#[derive(Debug, Default)]
pub struct FrameCompositor {
    frames: u64,
    last: ComposeStats,
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of composite passes run so far.
    pub fn frames_composed(&self) -> u64 {
        self.frames
    }

    pub fn last_stats(&self) -> ComposeStats {
        self.last
    }

    /// Clear the surface and draw every visual clip in order.
    pub fn compose(
        &mut self,
        surface: &mut dyn RasterSurface,
        visual: &[ResolvedClip<'_>],
        pool: &mut DecoderPool,
        playing: bool,
    ) -> ComposeStats {
        let mut stats = ComposeStats::default();
        surface.clear();
        let (width, height) = surface.size();

        for resolved in visual {
            let clip = resolved.clip;
            if !pool.get_or_create(clip) {
                stats.skipped += 1;
                continue;
            }
            position(pool, resolved, playing);

            let Some(frame) = pool.current_frame(clip.id) else {
                trace!("Clip {} has no frame yet", clip.id);
                stats.skipped += 1;
                continue;
            };

            let transform = BlitTransform::new(clip.mirror(), width, height);
            surface.set_alpha(clip.opacity as f32);
            let result = surface.blit(&frame, &transform);
            surface.set_alpha(1.0);
            match result {
                Ok(()) => stats.drawn += 1,
                Err(e) => {
                    warn!("Skipping clip {} this frame: {}", clip.id, e);
                    stats.skipped += 1;
                }
            }
        }

        self.frames += 1;
        self.last = stats;
        stats
    }
}

/// Put a clip's decoder where the playhead needs it.
fn position(pool: &mut DecoderPool, resolved: &ResolvedClip<'_>, playing: bool) {
    let clip = resolved.clip;
    let id: ClipId = clip.id;
    if clip.reversed {
        // Decoders only run forward; walk a paused decoder instead
        pool.set_playing(clip, false);
        pool.seek_exact(id, resolved.source_offset);
    } else if playing {
        pool.set_playing(clip, true);
        pool.seek_to(id, resolved.source_offset);
    } else {
        pool.set_playing(clip, false);
        pool.seek_exact(id, resolved.source_offset);
    }
}
