//! Decoder pool: one handle per clip id.
//!
//! The pool never owns clips. It maps clip ids to open handles, opens lazily
//! on first use and disposes handles whose clip has left the timeline. Every
//! lookup is defensive: an unknown id reads as "not active".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use splice_core::defaults::SEEK_EPSILON_SECONDS;
use splice_core::time::TIME_EPSILON;
use splice_core::{MediaKind, SharedFrameBuffer, SpliceError};
use splice_timeline::{Clip, ClipId};
use tracing::{debug, info, warn};

use crate::provider::{DecoderHandle, DecoderProvider};

struct PoolEntry {
    handle: Box<dyn DecoderHandle>,
    source: String,
    kind: MediaKind,
    /// Play was refused; the handle stays paused until rejections are cleared.
    rejected: bool,
}

/// Per-clip decoder handles.
pub struct DecoderPool {
    provider: Arc<dyn DecoderProvider>,
    entries: HashMap<ClipId, PoolEntry>,
    /// When each clip's source last failed to open.
    failed: HashMap<ClipId, Instant>,
    seek_epsilon: f64,
    retry_after: Duration,
}

/// Wait before reopening a source that failed.
pub const OPEN_RETRY_AFTER: Duration = Duration::from_secs(1);

impl DecoderPool {
    /// Create a pool opening handles through `provider`.
    pub fn new(provider: Arc<dyn DecoderProvider>) -> Self {
        Self {
            provider,
            entries: HashMap::new(),
            failed: HashMap::new(),
            seek_epsilon: SEEK_EPSILON_SECONDS,
            retry_after: OPEN_RETRY_AFTER,
        }
    }

    /// Override how long a failed source is left alone before reopening.
    pub fn with_open_retry(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Override the drift tolerance used by `seek_to`.
    pub fn with_seek_epsilon(mut self, seek_epsilon: f64) -> Self {
        self.seek_epsilon = seek_epsilon.max(0.0);
        self
    }

    pub fn seek_epsilon(&self) -> f64 {
        self.seek_epsilon
    }

    pub fn provider(&self) -> &Arc<dyn DecoderProvider> {
        &self.provider
    }

    /// Make sure a handle exists for `clip`. Returns false when the source
    /// cannot be opened; the clip is then skipped until the retry delay passes.
    pub fn get_or_create(&mut self, clip: &Clip) -> bool {
        self.get_or_create_as(clip, clip.kind)
    }

    /// Like `get_or_create`, decoding the source as `kind`. A video clip on an
    /// audio track is opened as `MediaKind::Audio`.
    pub fn get_or_create_as(&mut self, clip: &Clip, kind: MediaKind) -> bool {
        if let Some(entry) = self.entries.get(&clip.id) {
            if entry.source == clip.source && entry.kind == kind {
                return true;
            }
        }
        if let Some(failed_at) = self.failed.get(&clip.id) {
            if failed_at.elapsed() < self.retry_after {
                return false;
            }
        }
        if let Some(mut stale) = self.entries.remove(&clip.id) {
            stale.handle.dispose();
        }

        match self.provider.open(&clip.source, kind) {
            Ok(handle) => {
                self.failed.remove(&clip.id);
                info!("Opened {:?} decoder for clip {} ({})", kind, clip.id, clip.source);
                self.entries.insert(
                    clip.id,
                    PoolEntry {
                        handle,
                        source: clip.source.clone(),
                        kind,
                        rejected: false,
                    },
                );
                true
            }
            Err(e) => {
                warn!("Failed to open {} for clip {}: {}", clip.source, clip.id, e);
                self.failed.insert(clip.id, Instant::now());
                false
            }
        }
    }

    /// Seek only when the handle drifted further than the epsilon.
    /// Returns whether a seek was issued.
    pub fn seek_to(&mut self, id: ClipId, offset: f64) -> bool {
        let epsilon = self.seek_epsilon;
        self.seek_if_drifted(id, offset, epsilon)
    }

    /// Seek unless the handle already sits on `offset`.
    pub fn seek_exact(&mut self, id: ClipId, offset: f64) -> bool {
        self.seek_if_drifted(id, offset, TIME_EPSILON)
    }

    fn seek_if_drifted(&mut self, id: ClipId, offset: f64, tolerance: f64) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if (entry.handle.current_position() - offset).abs() > tolerance {
            entry.handle.seek(offset);
            true
        } else {
            false
        }
    }

    /// Start or stop a handle. Reversed clips are never told to play, and a
    /// handle whose play was refused stays paused.
    pub fn set_playing(&mut self, clip: &Clip, playing: bool) {
        let Some(entry) = self.entries.get_mut(&clip.id) else {
            return;
        };
        if !playing || clip.reversed || entry.rejected {
            if entry.handle.is_playing() {
                entry.handle.pause();
            }
            return;
        }
        if entry.handle.is_playing() {
            return;
        }
        match entry.handle.play() {
            Ok(()) => debug!("Clip {} playing", clip.id),
            Err(e) => {
                match e {
                    SpliceError::PlaybackRejected(reason) => {
                        warn!("Playback rejected for clip {}: {}", clip.id, reason)
                    }
                    other => warn!("Playback failed for clip {}: {}", clip.id, other),
                }
                entry.rejected = true;
                entry.handle.pause();
            }
        }
    }

    /// Pause a handle if it exists.
    pub fn pause(&mut self, id: ClipId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.handle.is_playing() {
                entry.handle.pause();
            }
        }
    }

    /// Pause every handle whose clip is not in `active`.
    pub fn pause_inactive(&mut self, active: &HashSet<ClipId>) {
        for (id, entry) in self.entries.iter_mut() {
            if !active.contains(id) && entry.handle.is_playing() {
                entry.handle.pause();
            }
        }
    }

    /// Forget playback refusals so the next play retries.
    pub fn clear_rejections(&mut self) {
        for entry in self.entries.values_mut() {
            entry.rejected = false;
        }
    }

    /// Dispose and drop handles whose clip is not in `live`.
    pub fn retain(&mut self, live: &HashSet<ClipId>) {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let keep = live.contains(id);
            if !keep {
                entry.handle.dispose();
            }
            keep
        });
        self.failed.retain(|id, _| live.contains(id));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("Disposed {} decoder handle(s)", dropped);
        }
    }

    /// Dispose every handle.
    pub fn dispose_all(&mut self) {
        for (_, mut entry) in self.entries.drain() {
            entry.handle.dispose();
        }
        self.failed.clear();
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_rejected(&self, id: ClipId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.rejected)
    }

    pub fn is_playing(&self, id: ClipId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.handle.is_playing())
    }

    pub fn is_presentable(&self, id: ClipId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| !e.rejected && e.handle.is_presentable())
    }

    pub fn position(&self, id: ClipId) -> Option<f64> {
        self.entries.get(&id).map(|e| e.handle.current_position())
    }

    /// The handle's current frame, if it has one to present.
    pub fn current_frame(&mut self, id: ClipId) -> Option<SharedFrameBuffer> {
        let entry = self.entries.get_mut(&id)?;
        if entry.rejected || !entry.handle.is_presentable() {
            return None;
        }
        entry.handle.current_frame()
    }

    pub fn set_volume(&mut self, id: ClipId, volume: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.handle.set_volume(volume);
        }
    }

    pub fn volume(&self, id: ClipId) -> Option<f64> {
        self.entries.get(&id).map(|e| e.handle.volume())
    }
}

impl Drop for DecoderPool {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
