//! Integration test crate for Splice.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the engine end to end with synthetic decoders and an
//! in-memory encoder.

#[cfg(test)]
mod fixture;

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod playback;

#[cfg(test)]
mod export;
