//! Splice Engine - Playback and export
//!
//! Ties the timeline, decoders, compositor and mixer together:
//! - `PlaybackClock`: wall-clock to timeline time
//! - `RenderScheduler`: one outstanding refresh at a time
//! - `Engine`: edits, transport, preview and export
//! - `driver`: tokio hosting helpers

pub mod clock;
pub mod config;
pub mod driver;
pub mod engine;
pub mod export;
pub mod scheduler;

pub use clock::{ClockState, PlaybackClock, TickOutcome};
pub use config::{EngineConfig, LoggingConfig};
pub use engine::{Engine, EngineSnapshot};
pub use export::{audio_feeds, ExportProgress, ProgressCallback};
pub use scheduler::{FreeRunning, ManualRefresh, RefreshScheduler, RenderScheduler, TickHandle};
