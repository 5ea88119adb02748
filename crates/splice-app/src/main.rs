//! Splice - headless timeline player and exporter
//!
//! ```text
//! splice preview <media>...
//! splice export <output> <media>...
//! ```
//!
//! Media is laid out back to back: video and stills on the video track,
//! audio on the audio track. Set `SPLICE_CONFIG` to a JSON config file to
//! override the defaults.

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use splice_core::MediaKind;
use splice_engine::{driver, Engine, EngineConfig, FreeRunning};
use splice_media::{AudioBus, AudioOutput, FfmpegEncoder, FfmpegProvider};
use splice_timeline::{Clip, EditCommand, TrackKind};
use tracing::{info, warn};

const USAGE: &str = "usage: splice preview <media>... | splice export <output> <media>...";

enum Command {
    Preview { media: Vec<String> },
    Export { output: PathBuf, media: Vec<String> },
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let command = match args.next().as_deref() {
        Some("preview") => Command::Preview {
            media: args.collect(),
        },
        Some("export") => {
            let output = args.next().context(USAGE)?;
            Command::Export {
                output: PathBuf::from(output),
                media: args.collect(),
            }
        }
        _ => bail!(USAGE),
    };
    Ok(command)
}

fn load_config() -> Result<EngineConfig> {
    match std::env::var_os("SPLICE_CONFIG") {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading config from {}", Path::new(&path).display())),
        None => Ok(EngineConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = parse_args()?;
    let config = load_config()?;
    logging::init_logging(&config.logging);

    info!("Splice starting...");

    if !splice_media::ffmpeg_available() {
        bail!("FFmpeg was not found; install it or put it on PATH");
    }

    let bus = AudioBus::new(config.audio_format());
    let mut provider = FfmpegProvider::new()
        .with_decode_size(config.decode.width, config.decode.height)
        .with_frame_rate(config.decode.frame_rate)
        .with_still_duration(config.playback.still_image_duration);

    // Keep the stream alive for the whole preview.
    let _output = match &command {
        Command::Preview { .. } => match AudioOutput::start(bus.clone()) {
            Ok(output) => {
                provider = provider.with_audio_bus(bus);
                Some(output)
            }
            Err(e) => {
                warn!("Audio output unavailable, previewing silently: {}", e);
                None
            }
        },
        Command::Export { .. } => None,
    };

    let provider = Arc::new(provider);
    let engine = Engine::with_cpu_surface(config.clone(), provider.clone(), Box::new(FreeRunning::new()))?;
    let engine = driver::shared(engine);

    let media = match &command {
        Command::Preview { media } | Command::Export { media, .. } => media,
    };
    if media.is_empty() {
        bail!(USAGE);
    }

    for source in media {
        let info = driver::probe_media(provider.clone(), source.clone())
            .await
            .with_context(|| format!("probing {}", source))?;

        let mut engine = engine.lock();
        let kind = if info.kind == MediaKind::Audio {
            TrackKind::Audio
        } else {
            TrackKind::Video
        };
        let track = engine
            .timeline()
            .tracks_of(kind)
            .next()
            .context("starter track missing")?;
        let track_id = track.id;

        let name = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        let mut clip = Clip::from_media(name, source.clone(), &info);
        clip.start_time = track.end_time();

        engine
            .edit(&EditCommand::AddClip { track_id, clip })
            .with_context(|| format!("adding {}", source))?;
        info!("Placed {} ({:?}, {:.2}s)", source, info.kind, info.duration_seconds);
    }

    match command {
        Command::Preview { .. } => {
            let stopped_at = driver::run_playback(engine).await;
            info!("Preview finished at {:.2}s", stopped_at);
        }
        Command::Export { output, .. } => {
            let format = config.export_format()?;
            let mut path = if output.is_relative() && output.parent() == Some(Path::new("")) {
                config.export.output_dir.join(&output)
            } else {
                output
            };
            if path.extension().is_none() {
                path.set_extension(format.extension());
            }

            let encoder = FfmpegEncoder::new(&path, format);
            let mut next_report = 0.1;
            let artifact = driver::run_export(
                engine,
                Box::new(encoder),
                Box::new(move |progress| {
                    if progress.fraction >= next_report {
                        info!("Export {:.0}%", progress.fraction * 100.0);
                        next_report = (progress.fraction + 0.1).min(1.0);
                    }
                }),
            )
            .await?;

            info!(
                "Wrote {} ({} frames, {:.2}s, {} bytes)",
                path.display(),
                artifact.frames_written,
                artifact.duration,
                artifact.bytes
            );
        }
    }

    Ok(())
}
