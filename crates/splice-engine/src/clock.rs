//! Playback clock.
//!
//! The clock owns no timers. Callers pass `now` into every transition,
//! which keeps playback deterministic under test.

use std::time::Instant;

use tracing::debug;

/// Externally visible clock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Paused,
    Playing,
}

/// Result of a clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Playback advanced to this time.
    Advanced(f64),
    /// The end of the timeline was reached. The clock is back at 0 and stopped.
    EndOfTimeline,
    /// Not playing; nothing happened.
    Idle,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Stopped,
    Paused,
    Playing { anchor: Instant, from: f64 },
}

/// Maps wall-clock instants to timeline time.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    mode: Mode,
    time: f64,
    total_duration: f64,
}

impl PlaybackClock {
    pub fn new(total_duration: f64) -> Self {
        Self {
            mode: Mode::Stopped,
            time: 0.0,
            total_duration: total_duration.max(0.0),
        }
    }

    pub fn state(&self) -> ClockState {
        match self.mode {
            Mode::Stopped => ClockState::Stopped,
            Mode::Paused => ClockState::Paused,
            Mode::Playing { .. } => ClockState::Playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.mode, Mode::Playing { .. })
    }

    /// Time as of the last transition or tick.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Timeline time at `now` without advancing the clock.
    pub fn time_at(&self, now: Instant) -> f64 {
        match self.mode {
            Mode::Playing { anchor, from } => {
                from + now.saturating_duration_since(anchor).as_secs_f64()
            }
            _ => self.time,
        }
    }

    /// Start playing from the current time. Returns false if already playing.
    pub fn play(&mut self, now: Instant) -> bool {
        if self.is_playing() {
            return false;
        }
        self.mode = Mode::Playing {
            anchor: now,
            from: self.time,
        };
        debug!(from = self.time, "Clock playing");
        true
    }

    /// Freeze time at the last ticked value. Returns false if not playing.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.mode = Mode::Paused;
        debug!(time = self.time, "Clock paused");
        true
    }

    /// Return to 0 and stop. Idempotent.
    pub fn stop(&mut self) {
        self.mode = Mode::Stopped;
        self.time = 0.0;
    }

    /// Jump to `time`, clamped to the timeline. Playing clocks re-anchor at `now`.
    pub fn seek(&mut self, time: f64, now: Instant) {
        self.time = self.clamp(time);
        match self.mode {
            Mode::Playing { .. } => {
                self.mode = Mode::Playing {
                    anchor: now,
                    from: self.time,
                };
            }
            // Stopped always sits at 0.
            Mode::Stopped if self.time > 0.0 => self.mode = Mode::Paused,
            _ => {}
        }
    }

    /// Advance a playing clock to `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }
        let t = self.time_at(now);
        if t >= self.total_duration {
            debug!(total = self.total_duration, "Clock reached end of timeline");
            self.stop();
            return TickOutcome::EndOfTimeline;
        }
        self.time = t;
        TickOutcome::Advanced(t)
    }

    /// Update the timeline length, pulling the time back inside it.
    pub fn set_total_duration(&mut self, total_duration: f64) {
        self.total_duration = total_duration.max(0.0);
        self.time = self.clamp(self.time);
    }

    fn clamp(&self, time: f64) -> f64 {
        if time.is_nan() {
            return 0.0;
        }
        time.clamp(0.0, self.total_duration)
    }
}
