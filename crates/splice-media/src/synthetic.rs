//! Deterministic in-memory decoders.
//!
//! `SyntheticProvider` serves registered sources as solid-colour frames (or
//! silent audio). Handle positions change only on seek, so tests can drive
//! the engine with simulated time and inspect exactly what each handle was
//! told to do.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use splice_core::{FrameBuffer, MediaInfo, MediaKind, Result, SharedFrameBuffer, SpliceError};
use tracing::debug;

use crate::provider::{DecoderHandle, DecoderProvider};

/// Observable state of one synthetic handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticHandleState {
    pub kind: MediaKind,
    pub position: f64,
    pub playing: bool,
    pub volume: f64,
    /// Number of `seek` calls received.
    pub seeks: usize,
    /// Number of `play` calls received, accepted or not.
    pub play_attempts: usize,
    pub disposed: bool,
}

impl SyntheticHandleState {
    fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            position: 0.0,
            playing: false,
            volume: 1.0,
            seeks: 0,
            play_attempts: 0,
            disposed: false,
        }
    }
}

#[derive(Clone)]
struct SourceEntry {
    info: MediaInfo,
    color: [u8; 4],
    reject_play: bool,
    presentable: bool,
}

#[derive(Default)]
struct Registry {
    sources: HashMap<String, SourceEntry>,
    handles: Vec<(String, Arc<Mutex<SyntheticHandleState>>)>,
}

/// A provider for tests and headless runs without FFmpeg.
#[derive(Clone, Default)]
pub struct SyntheticProvider {
    registry: Arc<Mutex<Registry>>,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `source` available with the given metadata. Visual sources
    /// decode to frames of `color`.
    pub fn register(&self, source: impl Into<String>, info: MediaInfo, color: [u8; 4]) {
        self.registry.lock().sources.insert(
            source.into(),
            SourceEntry {
                info,
                color,
                reject_play: false,
                presentable: true,
            },
        );
    }

    /// Refuse `play` on every handle of `source`.
    pub fn reject_play(&self, source: &str) {
        if let Some(entry) = self.registry.lock().sources.get_mut(source) {
            entry.reject_play = true;
        }
    }

    /// Control whether handles of `source` report a decoded frame.
    pub fn set_presentable(&self, source: &str, presentable: bool) {
        if let Some(entry) = self.registry.lock().sources.get_mut(source) {
            entry.presentable = presentable;
        }
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        self.registry.lock().handles.len()
    }

    /// State of the most recently opened handle for `source`.
    pub fn state(&self, source: &str) -> Option<SyntheticHandleState> {
        self.registry
            .lock()
            .handles
            .iter()
            .rev()
            .find(|(s, _)| s == source)
            .map(|(_, state)| state.lock().clone())
    }

    /// States of every handle opened for `source`, oldest first.
    pub fn states(&self, source: &str) -> Vec<SyntheticHandleState> {
        self.registry
            .lock()
            .handles
            .iter()
            .filter(|(s, _)| s == source)
            .map(|(_, state)| state.lock().clone())
            .collect()
    }
}

impl DecoderProvider for SyntheticProvider {
    fn probe(&self, source: &str) -> Result<MediaInfo> {
        self.registry
            .lock()
            .sources
            .get(source)
            .map(|entry| entry.info.clone())
            .ok_or_else(|| SpliceError::NotFound(source.to_string()))
    }

    fn open(&self, source: &str, kind: MediaKind) -> Result<Box<dyn DecoderHandle>> {
        let mut registry = self.registry.lock();
        let entry = registry
            .sources
            .get(source)
            .cloned()
            .ok_or_else(|| SpliceError::NotFound(source.to_string()))?;

        let frame = match (kind.is_visual(), entry.info.width, entry.info.height) {
            (true, Some(w), Some(h)) => Some(Arc::new(FrameBuffer::solid(w, h, entry.color))),
            _ => None,
        };
        let state = Arc::new(Mutex::new(SyntheticHandleState::new(kind)));
        registry.handles.push((source.to_string(), state.clone()));
        debug!("Synthetic handle opened for {}", source);

        Ok(Box::new(SyntheticHandle {
            state,
            registry: self.registry.clone(),
            source: source.to_string(),
            frame,
            duration: entry.info.duration_seconds,
        }))
    }
}

struct SyntheticHandle {
    state: Arc<Mutex<SyntheticHandleState>>,
    registry: Arc<Mutex<Registry>>,
    source: String,
    frame: Option<SharedFrameBuffer>,
    duration: f64,
}

impl SyntheticHandle {
    fn source_flags(&self) -> (bool, bool) {
        self.registry
            .lock()
            .sources
            .get(&self.source)
            .map(|e| (e.reject_play, e.presentable))
            .unwrap_or((false, false))
    }
}

impl DecoderHandle for SyntheticHandle {
    fn seek(&mut self, position: f64) {
        let mut state = self.state.lock();
        if state.disposed {
            return;
        }
        state.position = position.clamp(0.0, self.duration.max(0.0));
        state.seeks += 1;
    }

    fn play(&mut self) -> Result<()> {
        let (reject, _) = self.source_flags();
        let mut state = self.state.lock();
        state.play_attempts += 1;
        if reject {
            return Err(SpliceError::PlaybackRejected(format!(
                "{} refused to play",
                self.source
            )));
        }
        if !state.disposed {
            state.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn is_presentable(&self) -> bool {
        let (_, presentable) = self.source_flags();
        presentable && !self.state.lock().disposed
    }

    fn current_position(&self) -> f64 {
        self.state.lock().position
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        if !self.is_presentable() {
            return None;
        }
        self.frame.clone()
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn dispose(&mut self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.disposed = true;
        self.frame = None;
    }
}
