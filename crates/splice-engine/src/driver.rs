//! Async hosting on tokio.
//!
//! The engine sits behind a `parking_lot::Mutex`. A `tokio::time::interval`
//! stands in for the display refresh. A refresh that finds the engine busy
//! is dropped, and missed intervals are skipped rather than bunched up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use splice_core::{MediaInfo, Result, SpliceError};
use splice_media::{DecoderProvider, EncodedArtifact, StreamEncoder};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::export::ProgressCallback;

/// An engine shared between the host and the refresh loop.
pub type SharedEngine = Arc<Mutex<Engine>>;

pub fn shared(engine: Engine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Probe a source on the blocking pool.
pub async fn probe_media(provider: Arc<dyn DecoderProvider>, source: String) -> Result<MediaInfo> {
    tokio::task::spawn_blocking(move || provider.probe(&source))
        .await
        .map_err(|e| SpliceError::Media(format!("probe task failed: {}", e)))?
}

fn refresh_period(engine: &SharedEngine) -> Duration {
    let hz = engine.lock().config().playback.refresh_rate_hz;
    Duration::from_secs_f64(1.0 / hz)
}

/// Play from the current position until playback stops, either at the end
/// of the timeline or through `Engine::pause` from another task. Returns the
/// time playback stopped at.
pub async fn run_playback(engine: SharedEngine) -> f64 {
    let mut ticker = interval(refresh_period(&engine));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    engine.lock().play(Instant::now());
    info!("Playback loop started");

    loop {
        ticker.tick().await;
        let Some(mut guard) = engine.try_lock() else {
            debug!("Refresh skipped: engine busy");
            continue;
        };
        guard.on_refresh(Instant::now());
        if !guard.is_playing() {
            let time = guard.current_time();
            info!("Playback loop finished at {:.3}s", time);
            return time;
        }
    }
}

/// Run a complete export and wait for its artifact.
pub async fn run_export(
    engine: SharedEngine,
    mut encoder: Box<dyn StreamEncoder>,
    on_progress: ProgressCallback,
) -> Result<EncodedArtifact> {
    let mut ticker = interval(refresh_period(&engine));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    engine
        .lock()
        .export(encoder.as_mut(), Instant::now(), on_progress)?;

    loop {
        ticker.tick().await;
        let Some(mut guard) = engine.try_lock() else {
            debug!("Export refresh skipped: engine busy");
            continue;
        };
        guard.on_refresh(Instant::now());
        if let Some(result) = guard.take_export_result() {
            return result;
        }
        if !guard.is_exporting() {
            return Err(SpliceError::Encoder("export ended without a result".into()));
        }
    }
}
