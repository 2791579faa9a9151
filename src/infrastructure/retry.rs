//! Backoff policy for re-running failed reconciliations

use std::time::Duration;

use crate::config::SyncConfig;
use crate::domain::DirectoryError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retries
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_initial_delay(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn with_max_delay(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Whether another attempt should follow failed attempt number `attempt` (1-indexed)
    pub fn should_retry(&self, attempt: u32, error: &DirectoryError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Delay after failed attempt number `attempt` (1-indexed).
    ///
    /// A rate-limit `Retry-After` hint wins over the exponential schedule but
    /// is still capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32, error: &DirectoryError) -> Duration {
        if let Some(secs) = error.retry_after_secs() {
            let ms = secs.saturating_mul(1000).min(self.max_delay_ms);
            return Duration::from_millis(ms);
        }

        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }
}
