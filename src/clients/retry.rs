use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

use crate::config::StorefrontConfig;
use crate::error::StorefrontResult;

/// Ceiling for the background retry delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Bounded retries with doubling backoff for compensating writes.
///
/// Only errors for which [`is_retryable`](crate::error::StorefrontError::is_retryable)
/// holds are retried; any other error is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            backoff: config.retry_backoff,
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> StorefrontResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorefrontResult<T>>,
    {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    warn!(operation, attempt, error = %e, "Attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Runs `op` inline up to `attempts` times. If it is still failing
    /// transiently, a background task keeps retrying until it succeeds and
    /// this returns `Ok(())` immediately.
    ///
    /// Only a non-retryable error is returned.
    pub async fn run_until_success<F, Fut>(&self, operation: &'static str, op: F) -> StorefrontResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StorefrontResult<()>> + Send + 'static,
    {
        match self.run(operation, &op).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => {
                error!(operation, error = %e, "Retries exhausted, continuing in background");
                self.spawn_background(operation, op);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn spawn_background<F, Fut>(&self, operation: &'static str, op: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StorefrontResult<()>> + Send + 'static,
    {
        let mut delay = self.backoff.max(Duration::from_millis(1));
        let span = tracing::info_span!("background_retry", operation);
        tokio::spawn(
            async move {
                loop {
                    tokio::time::sleep(delay).await;
                    match op().await {
                        Ok(()) => {
                            info!("Background retry succeeded");
                            return;
                        }
                        Err(e) if e.is_retryable() => {
                            warn!(error = %e, "Background retry failed");
                            delay = delay.saturating_mul(2).min(MAX_BACKOFF);
                        }
                        Err(e) => {
                            error!(error = %e, "Background retry gave up on a permanent error");
                            return;
                        }
                    }
                }
            }
            .instrument(span),
        );
    }
}
