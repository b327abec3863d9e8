use std::time::Duration;

use crate::config::PersistRetryConfig;

/// Fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Zero is treated as one.
    pub max_attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        PersistRetryConfig::default().into()
    }
}

impl From<PersistRetryConfig> for RetryPolicy {
    fn from(cfg: PersistRetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            delay: Duration::from_millis(cfg.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before the next attempt, or `None` once `attempt`
    /// (1-based) has used up the budget.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts.max(1) {
            None
        } else {
            Some(self.delay)
        }
    }
}
