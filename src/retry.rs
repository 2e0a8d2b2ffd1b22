use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Errors that can tell a rate-limit rejection apart from other failures.
/// Rate limits back off exponentially; everything else waits a flat delay.
pub trait RetryableError {
    fn is_rate_limit(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of calls made before giving up, first attempt included.
    pub max_attempts: u32,
    /// Flat delay between attempts, and the base of the rate-limit curve.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Delay before the retry that follows a failure of the zero-based `attempt`.
pub fn retry_delay(policy: &RetryPolicy, attempt: u32, rate_limited: bool) -> Duration {
    if rate_limited {
        policy.base_delay * 2u32.saturating_pow(attempt)
    } else {
        policy.base_delay
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are spent.
/// The last failure is returned unchanged.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut failures = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if failures >= policy.max_attempts {
                    warn!(
                        "Giving up after {} attempts: {}",
                        policy.max_attempts, err
                    );
                    return Err(err);
                }
                let delay = retry_delay(policy, failures - 1, err.is_rate_limit());
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    failures, policy.max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
