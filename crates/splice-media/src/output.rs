//! Real-time audio output.
//!
//! Every open audio handle owns a `RingBuffer` registered on the shared
//! `AudioBus`. The cpal callback sums all registered queues into the device
//! buffer. A bus with no output attached simply accumulates nothing: the
//! decode workers stop writing once their queue is full.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use splice_core::{Result, SpliceError};
use tracing::{info, warn};

use crate::ring_buffer::RingBuffer;

/// Sample format shared by decoders and the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Queue size holding `seconds` of interleaved audio.
    pub fn samples_for(self, seconds: f64) -> usize {
        (seconds * self.sample_rate as f64).ceil() as usize * self.channels as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// The set of queues currently feeding the output.
#[derive(Clone)]
pub struct AudioBus {
    format: AudioFormat,
    queues: Arc<Mutex<Vec<Arc<RingBuffer>>>>,
}

impl AudioBus {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            queues: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Register a new queue of `capacity` samples.
    pub fn attach(&self, capacity: usize) -> Arc<RingBuffer> {
        let queue = Arc::new(RingBuffer::new(capacity));
        self.queues.lock().push(queue.clone());
        queue
    }

    /// Unregister a queue.
    pub fn detach(&self, queue: &Arc<RingBuffer>) {
        self.queues.lock().retain(|q| !Arc::ptr_eq(q, queue));
    }

    pub fn queue_count(&self) -> usize {
        self.queues.lock().len()
    }

    /// Sum every queue into `output`, which is zeroed first. Returns false
    /// when the queue list was busy and the buffer was left silent.
    pub fn mix(&self, output: &mut [f32]) -> bool {
        output.fill(0.0);
        let Some(queues) = self.queues.try_lock() else {
            return false;
        };
        for queue in queues.iter() {
            queue.mix_into(output);
        }
        for sample in output.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        true
    }
}

/// A running cpal output stream fed by an `AudioBus`.
///
/// The stream is not `Send` on every platform; keep it on the thread that
/// created it.
pub struct AudioOutput {
    _stream: cpal::Stream,
    format: AudioFormat,
}

impl AudioOutput {
    /// Open the default output device and start pulling from `bus`.
    pub fn start(bus: AudioBus) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SpliceError::Audio("no default output device".into()))?;
        let format = bus.format();
        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    bus.mix(data);
                },
                |err| warn!("Audio output error: {}", err),
                None,
            )
            .map_err(|e| SpliceError::Audio(format!("failed to build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| SpliceError::Audio(format!("failed to start output stream: {e}")))?;

        info!(
            "Audio output started: {} Hz, {} channel(s)",
            format.sample_rate, format.channels
        );
        Ok(Self {
            _stream: stream,
            format,
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}
