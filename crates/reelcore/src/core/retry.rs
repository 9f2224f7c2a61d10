//! Retry logic for upstream calls with bounded exponential backoff.
//!
//! Wraps a fallible async operation with:
//! - Exponential backoff (base delay doubling per attempt)
//! - A non-retryable status set — 401/403/404 indicate a durable
//!   authorization/existence problem and are re-raised immediately
//! - A failure-monitor report once the attempt budget is exhausted

use crate::core::config;
use crate::core::error::RelayError;
use crate::core::monitor::{FailureKind, FailureMonitor, FailureReport};
use std::future::Future;
use std::time::Duration;

/// Retry strategy for a single upstream call site.
///
/// Instantiated per call, not shared. Defaults follow the pipeline-wide
/// policy: 3 attempts, 1s base delay (1s, 2s schedule), no retry on
/// 401/403/404.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry
    pub base_delay: Duration,
    /// HTTP statuses that are never retried
    pub non_retryable_statuses: &'static [u16],
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: config::retry::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(config::retry::BASE_DELAY_MS),
            non_retryable_statuses: config::retry::NON_RETRYABLE_STATUSES,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Delay before attempt `k` (0-indexed, k >= 1): `base * 2^(k-1)`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Whether this error must be re-raised without another attempt.
    fn is_non_retryable(&self, error: &RelayError) -> bool {
        if let Some(status) = error.status_code() {
            if self.non_retryable_statuses.contains(&status) {
                return true;
            }
        }
        !error.is_retryable()
    }
}

/// Executes an async operation under a retry policy.
///
/// On final exhaustion the failure monitor receives an `UpstreamFailure`
/// report and the last underlying error is returned unchanged. The
/// monitor call is fire-and-forget — it must not panic or block.
pub async fn execute<F, Fut, T>(
    policy: &RetryPolicy,
    monitor: &dyn FailureMonitor,
    mut operation: F,
) -> Result<T, RelayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if policy.is_non_retryable(&e) => return Err(e),
            Err(e) if attempt >= policy.max_attempts => {
                monitor.report(FailureReport {
                    kind: FailureKind::UpstreamFailure,
                    message: e.to_string(),
                    attempts: attempt,
                });
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_before_attempt(attempt);
                log::warn!(
                    "Request failed (attempt {}/{}). Retrying in {:?}: {}",
                    attempt,
                    policy.max_attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
