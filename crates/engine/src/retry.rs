//! Bounded retries with exponential backoff for transient UI failures.

use std::{future::Future, time::Duration};

use {
    portalbot_config::RetryConfig,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{adaptive::AdaptiveTimeout, error::EngineError};

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` counts from 0.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let ms = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(exp);
        Duration::from_millis(ms.min(u64::MAX as f64) as u64)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.retry_base_delay_ms),
            backoff_factor: cfg.backoff_factor,
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempts run out.
///
/// Each attempt receives the current adaptive timeout and every outcome is
/// fed back into it. Only transient errors are retried. The backoff sleep
/// ends early if `cancel` fires.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: &mut AdaptiveTimeout,
    cancel: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        match op(timeout.current()).await {
            Ok(value) => {
                timeout.record_success();
                return Ok(value);
            },
            Err(e) => {
                timeout.record_failure();
                attempt += 1;

                if !e.is_transient() || attempt >= attempts {
                    if e.is_transient() {
                        warn!(operation = what, attempts, error = %e, "giving up after retries");
                    }
                    return Err(e);
                }

                let delay = policy.delay_for(attempt - 1);
                debug!(
                    operation = what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    next_timeout_ms = timeout.current().as_millis() as u64,
                    error = %e,
                    "retrying"
                );

                tokio::select! {
                    () = cancel.cancelled() => return Err(EngineError::Cancelled),
                    () = tokio::time::sleep(delay) => {},
                }
            },
        }
    }
}
