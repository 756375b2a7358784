use std::time::Duration;

use configs::StacConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Upper bound on a single backoff sleep.
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Bounded retry with exponential backoff.
///
/// `max_retries` counts retries after the first attempt. The delay before
/// retry `n` (1-based) is `backoff_factor * 2^(n - 1)` seconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self { max_retries, backoff_factor: backoff_factor.max(0.0) }
    }

    pub fn from_config(cfg: &StacConfig) -> Self {
        Self::new(cfg.retry, cfg.retry_factor)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor == 0.0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry.saturating_sub(1).min(62) as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(BACKOFF_MAX).min(BACKOFF_MAX)
    }

    async fn wait_before_retry(&self, retry: u32) {
        let delay = self.delay_for(retry);
        if delay.is_zero() {
            return;
        }
        debug!(?delay, retry, "backing off before retry");
        sleep(delay).await;
    }
}

/// Errors that know whether repeating the request can help.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() && attempt < policy.max_attempts() => {
                warn!(attempt, max_attempts = policy.max_attempts(), error = %error, "transient failure; retrying");
                policy.wait_before_retry(attempt).await;
                attempt += 1;
            }
            Err(error) => {
                if error.is_retryable() {
                    warn!(attempt, error = %error, "giving up after max attempts");
                }
                return Err(error);
            }
        }
    }
}
