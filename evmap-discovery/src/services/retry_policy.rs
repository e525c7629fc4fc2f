//! Bounded retry with exponential backoff
//!
//! Wraps one backend invocation. Each try is bounded by the per-call
//! timeout; only classified-transient failures are retried. Waiting for a
//! source's request budget happens before the timed section, so a busy rate
//! limiter never shows up as a timeout.
//!
//! **Backoff Strategy:**
//! - Delay before attempt k (k >= 2): `base_delay * 2^(k-2)`
//! - Sleeps go through the injected [`Clock`]

use crate::services::error_classifier::{DiscoveryError, ErrorClassifier, SourceError};
use evmap_common::config::SourceConfig;
use evmap_common::events::SourceKind;
use evmap_common::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    call_timeout: Duration,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        call_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            call_timeout,
            classifier: ErrorClassifier::new(),
            clock,
        }
    }

    pub fn from_config(config: &SourceConfig, call_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.max_attempts, config.base_delay(), call_timeout, clock)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt` (1-based); zero for the first
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 2)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds, fails non-transiently, or attempts run out
    ///
    /// The last classified error is returned when attempts are exhausted.
    pub async fn execute<F, Fut, T>(&self, source: SourceKind, operation: F) -> Result<T, DiscoveryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        self.execute_paced(source, || std::future::ready(()), operation)
            .await
    }

    /// [`Self::execute`], awaiting `pace` before every try, outside the timeout
    pub async fn execute_paced<P, PFut, F, Fut, T>(
        &self,
        source: SourceKind,
        mut pace: P,
        mut operation: F,
    ) -> Result<T, DiscoveryError>
    where
        P: FnMut() -> PFut,
        PFut: Future<Output = ()>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut attempt = 1;

        loop {
            if attempt > 1 {
                let backoff = self.delay_before(attempt);
                tracing::debug!(
                    source = %source,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying source call"
                );
                self.clock.sleep(backoff).await;
            }

            pace().await;

            let raw = match tokio::time::timeout(self.call_timeout, operation()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        tracing::debug!(source = %source, attempt, "Source call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(err)) => err,
                Err(_) => SourceError::Timeout(format!(
                    "no response within {} ms",
                    self.call_timeout.as_millis()
                )),
            };

            let classified = self.classifier.classify(source, &raw);

            if !classified.is_retryable() {
                return Err(classified);
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    source = %source,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = %classified,
                    "Source call failed: retries exhausted"
                );
                return Err(classified);
            }

            tracing::warn!(
                source = %source,
                attempt,
                max_attempts = self.max_attempts,
                error = %classified,
                "Transient source failure, will retry"
            );
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}
