//! Splice Audio - Audio mixing
//!
//! Drives the audio decoder handles of the live clips each tick:
//! - `MasterBus`: master volume and mute
//! - `AudioMixer`: per-clip gain, play/pause and drift correction

pub mod mixer;

pub use mixer::{effective_volume, AudioMixer, MasterBus, MixReport};
