use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bands within which a reported value counts as matching its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    pub brightness_pct: u8,
    /// Per channel, on the 0-255 scale.
    pub rgb: u8,
    pub kelvin: u32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            brightness_pct: 3,
            rgb: 10,
            kelvin: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay_after_send: f64,
    pub max_runtime_seconds: f64,
    pub use_exponential_backoff: bool,
    pub max_backoff_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_after_send: 2.0,
            max_runtime_seconds: 60.0,
            use_exponential_backoff: false,
            max_backoff_seconds: 30.0,
        }
    }
}

impl RetryPolicy {
    /// Seconds to wait between sending and verifying on the given attempt.
    pub fn calculate_delay(&self, attempt: u32) -> f64 {
        if self.use_exponential_backoff && attempt > 0 {
            let factor = 2f64.powi(attempt.min(63) as i32);
            (self.delay_after_send * factor).min(self.max_backoff_seconds)
        } else {
            self.delay_after_send
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::try_from_secs_f64(self.calculate_delay(attempt).max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn runtime_exceeded(&self, elapsed: Duration) -> bool {
        elapsed.as_secs_f64() >= self.max_runtime_seconds
    }
}
