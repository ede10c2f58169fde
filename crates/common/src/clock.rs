//! Clock and timing utilities for preview synchronization.
//!
//! The playback synchronizer advances a logical playhead by the wall time
//! elapsed between frames. This module provides:
//! - A frame clock that measures elapsed time between ticks
//! - Drift measurement between the playhead and a preview surface

use std::time::{Duration, Instant};

/// Measures wall time elapsed between consecutive ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_tick: Option<Instant>,
    /// Upper bound for a single step, so a stalled host does not make the
    /// playhead jump by seconds at once.
    max_step: Duration,
}

impl FrameClock {
    /// Create a clock with the given per-tick cap.
    pub fn new(max_step: Duration) -> Self {
        Self {
            last_tick: None,
            max_step,
        }
    }

    /// Seconds elapsed since the previous tick. The first tick returns 0.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Same as [`FrameClock::tick`] with an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let elapsed = match self.last_tick {
            Some(last) => now.saturating_duration_since(last).min(self.max_step),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        elapsed.as_secs_f64()
    }

    /// Forget the previous tick (after pause or seek).
    pub fn reset(&mut self) {
        self.last_tick = None;
    }

    /// Frame interval for a target rate.
    pub fn interval_for_fps(fps: u32) -> Duration {
        Duration::from_secs_f64(1.0 / fps.max(1) as f64)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

/// Drift between the computed media time and a surface's reported position.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Position the synchronizer expects (seconds of media time).
    pub expected_secs: f64,
    /// Position the surface reports.
    pub reported_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = surface is ahead).
    pub fn drift_secs(&self) -> f64 {
        self.reported_secs - self.expected_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds(&self, tolerance_secs: f64) -> bool {
        self.drift_secs().abs() > tolerance_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_is_zero() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(), 0.0);
    }

    #[test]
    fn test_tick_measures_and_caps_elapsed() {
        let mut clock = FrameClock::new(Duration::from_millis(100));
        let start = Instant::now();
        clock.tick_at(start);
        let step = clock.tick_at(start + Duration::from_millis(40));
        assert!((step - 0.04).abs() < 1e-9);

        // A long stall is capped
        let step = clock.tick_at(start + Duration::from_secs(3));
        assert!((step - 0.1).abs() < 1e-9);

        clock.reset();
        assert_eq!(clock.tick_at(start + Duration::from_secs(4)), 0.0);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            expected_secs: 1.0,
            reported_secs: 1.05,
        };
        assert!((drift.drift_ms() - 50.0).abs() < 1e-6);
        assert!(drift.exceeds(0.01));
        assert!(!drift.exceeds(0.1));
    }

    #[test]
    fn test_interval_for_fps() {
        assert_eq!(FrameClock::interval_for_fps(50), Duration::from_millis(20));
        // zero fps is treated as 1 fps
        assert_eq!(FrameClock::interval_for_fps(0), Duration::from_secs(1));
    }
}
