//! Remote-Call Retry
//!
//! Exponential backoff with jitter for transient remote failures. Only
//! errors classified transient (rate limit, network, server-side) are
//! retried; auth and bad-request failures surface immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::RetryConfig;
use crate::types::Result;

/// Backoff policy derived from [`RetryConfig`]
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_secs(config.max_delay_secs),
        }
    }

    /// Total attempts this policy allows (initial call + retries)
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (0-based): base * 2^retry, capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry);
        let delay = self.base_delay.saturating_mul(factor as u32);
        delay.min(self.max_delay)
    }

    /// The full pre-jitter delay schedule, one entry per possible retry
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|r| self.delay_for(r)).collect()
    }
}

/// Random jitter in [0, delay/4] so synchronized clients spread out
fn jitter(delay: Duration) -> Duration {
    let quarter = delay.as_millis() as u64 / 4;
    if quarter == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=quarter))
}

/// Run `op`, retrying transient failures per `policy`. `label` names the
/// call in log output.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry) + jitter(policy.delay_for(retry));
                warn!(
                    call = label,
                    attempt = retry + 1,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Like [`with_backoff`] but exhaustion and non-transient errors are
/// reported as `None` rather than propagated. Used for the existence probe,
/// where a failed lookup degrades to a fresh create.
pub async fn with_backoff_optional<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    op: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match with_backoff(policy, label, op).await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(call = label, error = %err, "Lookup failed, proceeding without it");
            None
        }
    }
}
