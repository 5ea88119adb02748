//! Audio handles streaming PCM into the output bus.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use splice_core::{Result, SharedFrameBuffer};
use tracing::{debug, warn};

use super::{ffmpeg_reader, Playhead};
use crate::output::{AudioBus, AudioFormat};
use crate::provider::DecoderHandle;
use crate::ring_buffer::RingBuffer;

/// Seconds of audio queued ahead of the device.
const QUEUE_SECONDS: f64 = 0.5;
/// Samples read from ffmpeg per chunk.
const CHUNK_SAMPLES: usize = 4096;

fn pcm_worker(args: Vec<String>, queue: Arc<RingBuffer>, stop: Arc<AtomicBool>) {
    let mut child = match ffmpeg_reader(&args).spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to spawn ffmpeg audio decoder: {}", e);
            return;
        }
    };
    let Some(mut stdout) = child.stdout.take() else {
        let _ = child.kill();
        return;
    };

    let mut bytes = vec![0u8; CHUNK_SAMPLES * 4];
    let mut samples = Vec::with_capacity(CHUNK_SAMPLES);
    'read: while !stop.load(Ordering::Relaxed) {
        let n = match stdout.read(&mut bytes) {
            Ok(0) => break,
            Ok(n) => n - n % 4,
            Err(e) => {
                debug!("Audio stream ended: {}", e);
                break;
            }
        };
        samples.clear();
        samples.extend(
            bytes[..n]
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );

        let mut written = 0;
        while written < samples.len() {
            if stop.load(Ordering::Relaxed) {
                break 'read;
            }
            written += queue.write(&samples[written..]);
            if written < samples.len() {
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}

struct Stream {
    queue: Arc<RingBuffer>,
    stop: Arc<AtomicBool>,
}

/// An audio source. With a bus attached it decodes while playing; without
/// one it only keeps time.
pub(crate) struct AudioHandle {
    source: String,
    bus: Option<AudioBus>,
    playhead: Playhead,
    stream: Option<Stream>,
    volume: f64,
}

impl AudioHandle {
    pub(crate) fn open(source: &str, duration: f64, bus: Option<AudioBus>) -> Self {
        Self {
            source: source.to_string(),
            bus,
            playhead: Playhead::new(duration),
            stream: None,
            volume: 1.0,
        }
    }

    fn start_stream(&mut self) {
        self.stop_stream();
        let Some(bus) = &self.bus else {
            return;
        };
        let AudioFormat {
            sample_rate,
            channels,
        } = bus.format();
        let start = self.playhead.position();
        let args = vec![
            "-ss".into(),
            format!("{start:.6}"),
            "-i".into(),
            self.source.clone(),
            "-vn".into(),
            "-f".into(),
            "f32le".into(),
            "-ac".into(),
            channels.to_string(),
            "-ar".into(),
            sample_rate.to_string(),
            "pipe:1".into(),
        ];

        let queue = bus.attach(bus.format().samples_for(QUEUE_SECONDS));
        queue.set_gain(self.volume as f32);
        let stop = Arc::new(AtomicBool::new(false));
        let (worker_queue, worker_stop) = (queue.clone(), stop.clone());
        thread::spawn(move || pcm_worker(args, worker_queue, worker_stop));
        self.stream = Some(Stream { queue, stop });
    }

    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop.store(true, Ordering::Relaxed);
            stream.queue.clear();
            if let Some(bus) = &self.bus {
                bus.detach(&stream.queue);
            }
        }
    }
}

impl DecoderHandle for AudioHandle {
    fn seek(&mut self, position: f64) {
        self.playhead.seek(position);
        if self.playhead.is_running() {
            self.start_stream();
        }
    }

    fn play(&mut self) -> Result<()> {
        if !self.playhead.is_running() {
            self.playhead.run();
            self.start_stream();
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead.halt();
        self.stop_stream();
    }

    fn is_playing(&self) -> bool {
        self.playhead.is_running()
    }

    fn is_presentable(&self) -> bool {
        true
    }

    fn current_position(&self) -> f64 {
        self.playhead.position()
    }

    fn current_frame(&mut self) -> Option<SharedFrameBuffer> {
        None
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        if let Some(stream) = &self.stream {
            stream.queue.set_gain(volume as f32);
        }
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn dispose(&mut self) {
        self.playhead.halt();
        self.stop_stream();
        debug!("Disposed audio decoder for {}", self.source);
    }
}
