use std::time::Duration;

/// Retry configuration with exponential backoff.
///
/// Default schedule: 3 attempts, delays of 1s and 2s between them
/// (base 500ms doubled per attempt).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay to sleep after a failed attempt (1-indexed).
    ///
    /// - Attempt 1: base × multiplier
    /// - Attempt 2: base × multiplier²
    /// - ...
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.max(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}
