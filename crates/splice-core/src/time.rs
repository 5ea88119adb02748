//! Time representation.
//!
//! Timeline positions are continuous seconds (`f64`) because the playback
//! clock is wall-clock driven. Frame rates stay rational so export can hit
//! exact NTSC rates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used when comparing derived second values.
pub const TIME_EPSILON: f64 = 1e-9;

/// A half-open span of timeline seconds: `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Start time (inclusive)
    pub start: f64,
    /// Duration of the span
    pub duration: f64,
}

impl TimeSpan {
    /// Create a new span from start and duration.
    #[inline]
    pub const fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> f64 {
        self.start + self.duration
    }

    /// Check if a time is within this span.
    #[inline]
    pub fn contains(self, time: f64) -> bool {
        time >= self.start && time < self.end()
    }

    /// Check if two spans overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame in seconds.
    #[inline]
    pub fn frame_duration(self) -> f64 {
        self.denominator as f64 / self.numerator as f64
    }

    /// Number of whole frames that start before `seconds`.
    pub fn frames_until(self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.to_fps_f64() - TIME_EPSILON).ceil().max(0.0) as u64
    }

    /// Common frame rates
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_is_half_open() {
        let span = TimeSpan::new(2.0, 3.0);
        assert!(span.contains(2.0));
        assert!(span.contains(4.999));
        assert!(!span.contains(1.999));
        assert!(!span.contains(5.0));
    }

    #[test]
    fn test_span_overlap() {
        let a = TimeSpan::new(0.0, 10.0);
        assert!(a.overlaps(TimeSpan::new(5.0, 10.0)));
        assert!(!a.overlaps(TimeSpan::new(10.0, 1.0)));
    }

    #[test]
    fn test_frames_until() {
        let rate = FrameRate::FPS_30;
        assert_eq!(rate.frames_until(0.0), 0);
        assert_eq!(rate.frames_until(1.0), 30);
        assert_eq!(rate.frames_until(1.01), 31);
    }

    #[test]
    fn test_frame_rate_display() {
        assert_eq!(FrameRate::FPS_24.to_string(), "24 fps");
        assert_eq!(FrameRate::FPS_29_97.to_string(), "29.970 fps");
    }
}
