use crate::core::config::{DelayRange, FetchConfig};
use crate::core::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one failed attempt.
#[derive(Debug)]
pub enum Failure {
    /// Transient failure (429, 5xx, network); the cause is kept for the final error.
    Retry(String),
    /// Fails the operation without another attempt.
    Abort(Error),
}

/// Attempt budget and the pauses taken around each attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub polite_delay: DelayRange,
    pub backoff_base: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    /// A policy without any pauses.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            polite_delay: DelayRange { min: 0, max: 0 },
            backoff_base: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    fn polite_delay(&self) -> Duration {
        let DelayRange { min, max } = self.polite_delay;
        let ms = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_millis(ms)
    }

    /// `2^(attempt-1)` base units plus a random jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        self.backoff_base.saturating_mul(factor) + jitter
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            polite_delay: config.polite_delay_ms,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }
}

/// Sleeps for `duration` unless `ctx` is cancelled first.
pub async fn sleep_or_cancel(ctx: &CancellationToken, duration: Duration) -> Result<()> {
    if duration.is_zero() {
        return if ctx.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Runs `operation` until it succeeds, aborts, or the attempt budget is spent.
///
/// Every attempt is preceded by the polite delay; transient failures are
/// followed by exponential backoff. Exhausting the budget yields
/// [`Error::Fetch`] carrying the last cause.
pub async fn with_retry<F, Fut, T>(
    ctx: &CancellationToken,
    policy: &RetryPolicy,
    resource: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, Failure>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        sleep_or_cancel(ctx, policy.polite_delay()).await?;

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(Error::Cancelled),
            outcome = operation() => outcome,
        };

        match outcome {
            Ok(val) => return Ok(val),
            Err(Failure::Abort(err)) => return Err(err),
            Err(Failure::Retry(cause)) => {
                if attempt >= max_attempts {
                    debug!("Giving up on {} after {} attempts", resource, attempt);
                    return Err(Error::fetch(resource, cause));
                }
                let backoff = policy.backoff(attempt);
                warn!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
                    attempt, max_attempts, resource, cause, backoff
                );
                sleep_or_cancel(ctx, backoff).await?;
                attempt += 1;
            }
        }
    }
}
