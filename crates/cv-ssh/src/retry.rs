//! Connection retry policy
//!
//! Only failures that another attempt could fix are retried (see
//! [`ConnectionError::is_retryable`]); the delay before retry `n` is
//! `initial * multiplier^n`, capped at `max`, plus random jitter.

use std::future::Future;
use std::time::Duration;

use cv_core::config::BackoffConfig;
use cv_core::ConnectionError;

/// Delay schedule between connection attempts
#[derive(Debug, Clone)]
pub(crate) struct RetryDelays {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl RetryDelays {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            initial: config.initial,
            max: config.max,
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }

    /// Capped delay before retry `retry`, without jitter. Never panics,
    /// whatever the configured multiplier.
    pub fn base(&self, retry: u32) -> Duration {
        // NaN.max(1.0) is 1.0
        let multiplier = self.multiplier.max(1.0);
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max, |d| d.min(self.max))
    }

    /// Delay before retry `retry`: the base delay plus up to `jitter` of it
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base(retry);
        if !(0.0..=1.0).contains(&self.jitter) {
            return base;
        }
        let extra = base.as_secs_f64() * self.jitter * rand::random::<f64>();
        base.saturating_add(Duration::try_from_secs_f64(extra).unwrap_or_default())
    }
}

/// Run `connect` until it succeeds, fails permanently, or `attempts` runs out
pub(crate) async fn retry_connect<T, F, Fut>(
    target: &str,
    attempts: u32,
    delays: &RetryDelays,
    mut connect: F,
) -> Result<T, ConnectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectionError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = delays.delay(attempt - 1);
                tracing::warn!(
                    host = target,
                    attempt,
                    "Connection failed: {}. Retrying in {:?}",
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
