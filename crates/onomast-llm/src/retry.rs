//! Backoff policy for transient provider failures.
//!
//! The provider itself never retries. Callers that want retries loop around
//! a single call and use [`RetryConfig::delay_for`] between attempts, so
//! every retry goes back through whatever pacing the caller enforces.

use std::time::Duration;

use rand::Rng;

use crate::error::ProviderError;

/// Retry behaviour for one logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Extra attempts after the first one. Zero disables retries.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Random `0..jitter_fraction * delay` is added to each delay.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.25,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed) after `err`.
    ///
    /// A rate-limit hint from the provider wins when it is longer than the
    /// computed backoff.
    pub fn delay_for(&self, err: &ProviderError, attempt: u32) -> Duration {
        let computed = compute_delay(self, attempt);
        match err {
            ProviderError::RateLimited { retry_after_ms } => {
                computed.max(Duration::from_millis(*retry_after_ms).min(self.max_delay))
            }
            _ => computed,
        }
    }
}

/// Whether an error is worth another attempt.
pub fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::RateLimited { .. } | ProviderError::Timeout | ProviderError::Http(_) => true,
        ProviderError::RequestFailed(msg) => {
            msg.starts_with("HTTP 500")
                || msg.starts_with("HTTP 502")
                || msg.starts_with("HTTP 503")
                || msg.starts_with("HTTP 504")
        }
        ProviderError::AuthFailed(_)
        | ProviderError::ModelNotFound(_)
        | ProviderError::NotConfigured(_)
        | ProviderError::InvalidResponse(_)
        | ProviderError::Json(_) => false,
    }
}

/// `min(base_delay * 2^attempt, max_delay)` plus jitter.
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let base_ms = config.base_delay.as_millis() as u64;
    let capped_ms = base_ms
        .saturating_mul(exp)
        .min(config.max_delay.as_millis() as u64);

    let jitter_max_ms = (capped_ms as f64 * config.jitter_fraction) as u64;
    let jitter_ms = if jitter_max_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_max_ms)
    } else {
        0
    };

    Duration::from_millis(capped_ms + jitter_ms)
}
