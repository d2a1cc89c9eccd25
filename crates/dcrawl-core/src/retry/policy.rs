use std::time::Duration;

use crate::config::RetryConfig;

/// Decision returned by the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Attempts exhausted; the row fails for this run.
    GiveUp,
    /// Wait `delay`, then try again. `refresh_session` forces a re-login
    /// before the next attempt whatever the cause of the failure.
    RetryAfter { delay: Duration, refresh_session: bool },
}

/// Per-row policy: a fixed number of attempts with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// The wait after failed attempt k is `k * delay`.
    pub delay: Duration,
    /// Auth-required signals per row that trigger a refresh without using up
    /// an attempt.
    pub max_auth_refreshes: u32,
}

impl Default for RowRetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RowRetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            delay: Duration::try_from_secs_f64(cfg.delay_secs.max(0.0)).unwrap_or(Duration::MAX),
            max_auth_refreshes: cfg.max_auth_refreshes,
        }
    }

    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter {
            delay: self.delay.saturating_mul(attempt),
            refresh_session: attempt + 1 == self.max_attempts,
        }
    }
}
