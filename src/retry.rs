//! Exponential backoff around throttled operations.
//!
//! Local throttling is predictive: it spaces requests so limits are never
//! hit. This layer is reactive: when the provider rejects a request anyway,
//! it backs off, tells the throttle to forget its window, and tries again a
//! bounded number of times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::provider::Provider;
use crate::throttle::Throttle;

/// Classification seam supplied by the transport layer.
///
/// Implemented by the transport's error type so the retry loop can separate
/// provider rate-limit rejections (retried with backoff) from every other
/// failure (propagated immediately). The crate's
/// [`ApiFailure`](crate::error::ApiFailure) carries the reference
/// implementation.
pub trait Retryable {
    fn is_rate_limit(&self) -> bool;
}

/// Retry policy for rate-limited operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_tries: u32,
    /// Exponential base; attempt `n` waits `base^n` seconds.
    pub base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 5,
            base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay for a zero-indexed failed attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.base.powi(attempt as i32))
    }
}

/// Executes operations against a named provider with throttling and backoff.
pub struct Retrier {
    throttle: Arc<Throttle>,
    policy: RetryPolicy,
}

impl Retrier {
    pub fn new(throttle: Arc<Throttle>) -> Self {
        Self::with_policy(throttle, RetryPolicy::default())
    }

    pub fn with_policy(throttle: Arc<Throttle>, policy: RetryPolicy) -> Self {
        Self { throttle, policy }
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// Run `operation` against `provider`, retrying rate-limit rejections.
    ///
    /// Each attempt passes through [`Throttle::acquire`] first. A failure
    /// whose [`Retryable::is_rate_limit`] is true sleeps `base^attempt`
    /// seconds, resets the provider's throttle window, and retries; any
    /// other failure propagates untouched. After `max_tries` attempts the
    /// last rate-limit error is returned.
    pub async fn invoke<T, E, F, Fut>(
        &self,
        provider: Provider,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt: u32 = 0;

        loop {
            self.throttle.acquire(provider).await;

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            provider = %provider,
                            attempt = attempt + 1,
                            "request succeeded after backoff"
                        );
                    }
                    return Ok(result);
                }
                Err(error) if error.is_rate_limit() => {
                    if attempt + 1 >= self.policy.max_tries {
                        warn!(
                            provider = %provider,
                            attempts = self.policy.max_tries,
                            error = %error,
                            "rate limit retries exhausted"
                        );
                        self.throttle
                            .metrics()
                            .record_retries_exhausted(provider)
                            .await;
                        return Err(error);
                    }

                    let wait = self.policy.backoff_delay(attempt);
                    warn!(
                        provider = %provider,
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs_f64(),
                        error = %error,
                        "rate limited, backing off"
                    );

                    sleep(wait).await;
                    self.throttle.reset_window(provider).await;
                    self.throttle.metrics().record_backoff_retry(provider).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Resolve a model or service name, then [`invoke`](Self::invoke).
    pub async fn invoke_for<T, E, F, Fut>(&self, name: &str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        self.invoke(Provider::resolve(name), operation).await
    }
}
