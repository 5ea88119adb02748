//! Lock-free single-producer single-consumer sample queue.
//!
//! The audio decode worker writes interleaved f32 PCM, the output callback
//! mixes it out. Samples are stored as their bit patterns in atomics so the
//! queue needs neither locks nor unsafe code.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// A SPSC ring of f32 samples with a per-queue gain.
pub struct RingBuffer {
    slots: Box<[AtomicU32]>,
    read_pos: AtomicUsize,
    write_pos: AtomicUsize,
    /// Gain applied while mixing out, stored as f32 bits.
    gain: AtomicU32,
}

impl RingBuffer {
    /// Create a queue holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        // One spare slot tells full from empty
        let slots = (0..capacity + 1).map(|_| AtomicU32::new(0)).collect();
        Self {
            slots,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            gain: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    /// Usable capacity in samples.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of samples available for reading.
    pub fn available_read(&self) -> usize {
        let w = self.write_pos.load(Ordering::Acquire);
        let r = self.read_pos.load(Ordering::Acquire);
        (w + self.slots.len() - r) % self.slots.len()
    }

    /// Number of samples that can be written.
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    /// Queue samples. Returns the number actually written.
    pub fn write(&self, data: &[f32]) -> usize {
        let count = data.len().min(self.available_write());
        let len = self.slots.len();
        let w = self.write_pos.load(Ordering::Relaxed);
        for (i, sample) in data[..count].iter().enumerate() {
            self.slots[(w + i) % len].store(sample.to_bits(), Ordering::Relaxed);
        }
        self.write_pos.store((w + count) % len, Ordering::Release);
        count
    }

    /// Add queued samples, scaled by the gain, onto `output`. Positions past
    /// the queued data are left untouched. Returns the number consumed.
    pub fn mix_into(&self, output: &mut [f32]) -> usize {
        let count = output.len().min(self.available_read());
        let gain = self.gain();
        let len = self.slots.len();
        let r = self.read_pos.load(Ordering::Relaxed);
        for (i, out) in output[..count].iter_mut().enumerate() {
            *out += f32::from_bits(self.slots[(r + i) % len].load(Ordering::Relaxed)) * gain;
        }
        self.read_pos.store((r + count) % len, Ordering::Release);
        count
    }

    /// Drop everything queued (used on seek).
    pub fn clear(&self) {
        self.read_pos
            .store(self.write_pos.load(Ordering::Acquire), Ordering::Release);
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }
}
