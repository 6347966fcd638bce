use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Largest accepted step magnitude, in pixels.
pub const MAX_PIXELS_PER_STEP: i64 = 5000;
/// Longest accepted step interval (10 minutes).
pub const MAX_STEP_INTERVAL_MS: i64 = 600_000;
/// Shortest accepted step interval.
pub const MIN_STEP_INTERVAL_MS: i64 = 1;

/// Step parameters for one scrolling session.
///
/// The sign of `pixels_per_step` is the scroll direction. Field names on the
/// wire match the persisted record (`pixelsPerStep`, `stepIntervalMs`, `loop`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSettings {
    pub pixels_per_step: i32,
    pub step_interval_ms: u32,
    #[serde(rename = "loop", default)]
    pub looping: bool,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            pixels_per_step: 5,
            step_interval_ms: 25,
            looping: false,
        }
    }
}

impl ScrollSettings {
    /// Builds settings from raw numbers, rejecting anything out of bounds.
    pub fn new(pixels_per_step: i64, step_interval_ms: i64, looping: bool) -> Result<Self, ValidationError> {
        Self::check_bounds(pixels_per_step, step_interval_ms)?;
        Ok(Self {
            pixels_per_step: pixels_per_step as i32,
            step_interval_ms: step_interval_ms as u32,
            looping,
        })
    }

    /// Re-checks bounds on an already constructed value (e.g. one read from disk).
    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::check_bounds(self.pixels_per_step as i64, self.step_interval_ms as i64)
    }

    /// Step interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms as u64)
    }

    // Checks run in the same order the settings form reports them.
    fn check_bounds(pixels: i64, interval: i64) -> Result<(), ValidationError> {
        if pixels == 0 {
            return Err(ValidationError::ZeroPixels);
        }
        if interval < MIN_STEP_INTERVAL_MS {
            return Err(ValidationError::IntervalTooShort(interval));
        }
        if pixels.abs() > MAX_PIXELS_PER_STEP {
            return Err(ValidationError::PixelsOutOfRange(pixels));
        }
        if interval > MAX_STEP_INTERVAL_MS {
            return Err(ValidationError::IntervalTooLong(interval));
        }
        Ok(())
    }
}

/// Fixed periods and thresholds of the coordination protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Period of the orchestrator's stepping tick.
    pub step_tick: Duration,
    /// Period of both sides' liveness ticks.
    pub liveness_tick: Duration,
    /// Silence after which a counterpart is considered throttled.
    pub throttle_threshold: Duration,
    /// Upper bound on waiting for any reply on the transport.
    pub reply_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_tick: Duration::from_millis(10),
            liveness_tick: Duration::from_millis(50),
            throttle_threshold: Duration::from_millis(100),
            reply_timeout: Duration::from_millis(50),
        }
    }
}

impl TimingConfig {
    /// Throttling threshold in clock milliseconds.
    pub fn throttle_threshold_ms(&self) -> u64 {
        self.throttle_threshold.as_millis() as u64
    }
}
