//! Retry controller for a single logical request.
//!
//! # Responsibilities
//! - Race every attempt against the per-attempt deadline
//! - Decide whether a failed attempt may be repeated
//! - Enforce the attempt cap and the total wall-clock budget
//!
//! # Design Decisions
//! - Only 429, 5xx and "no response" are retried; 403 and other 4xx are final
//! - At most `retries + 1` attempts, and none starts after the budget is spent
//! - Jittered pause between attempts, uniform in [base/2, 3*base/2]
//! - A timed-out attempt is detached, never awaited again

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::resilience::backoff::{jittered_delay, RETRY_BACKOFF_BASE_MS};
use crate::resilience::timeouts::{with_deadline, DeadlineError};
use crate::upstream::{ErrorClass, TransportError, TransportResult};

/// Retry parameters resolved from a configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub retries: u32,
    pub attempt_timeout: Duration,
    pub total_timeout: Duration,
    pub backoff_base_ms: u64,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            retries: config.retries,
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            total_timeout: Duration::from_millis(config.total_timeout_ms),
            backoff_base_ms: RETRY_BACKOFF_BASE_MS,
        }
    }
}

/// Final result of the retry loop.
#[derive(Debug)]
pub struct RetryReport {
    /// The last attempt's result.
    pub result: TransportResult,
    pub attempts: u32,
}

/// Whether the result of an attempt is worth repeating.
pub fn is_retryable(result: &TransportResult) -> bool {
    match result {
        Ok(response) if response.is_ok() => false,
        Ok(response) => ErrorClass::of(response.status).is_retryable(),
        Err(_) => ErrorClass::Network.is_retryable(),
    }
}

impl From<DeadlineError> for TransportError {
    fn from(e: DeadlineError) -> Self {
        match e {
            DeadlineError::Elapsed(_) => TransportError::Timeout,
            DeadlineError::Aborted(reason) => TransportError::Other(reason),
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` until it succeeds, fails terminally, or the policy is
    /// exhausted.
    pub async fn run<F, Fut>(&self, mut attempt: F) -> RetryReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportResult> + Send + 'static,
    {
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let remaining = self.total_timeout.saturating_sub(start.elapsed());
            let deadline = self.attempt_timeout.min(remaining);

            let result = match with_deadline(attempt(), deadline).await {
                Ok(result) => result,
                Err(e) => Err(TransportError::from(e)),
            };

            if !self.enabled || !is_retryable(&result) || !self.may_continue(attempts, start) {
                return RetryReport { result, attempts };
            }

            let delay = jittered_delay(self.backoff_base_ms);
            tracing::debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                outcome = %describe(&result),
                "Retrying direct request"
            );
            tokio::time::sleep(delay).await;

            if start.elapsed() >= self.total_timeout {
                return RetryReport { result, attempts };
            }
        }
    }

    fn may_continue(&self, attempts: u32, start: Instant) -> bool {
        attempts <= self.retries && start.elapsed() < self.total_timeout
    }
}

fn describe(result: &TransportResult) -> String {
    match result {
        Ok(response) => response.status.to_string(),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::UpstreamResponse;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            enabled: true,
            retries,
            attempt_timeout: Duration::from_millis(1_500),
            total_timeout: Duration::from_millis(4_000),
            backoff_base_ms: RETRY_BACKOFF_BASE_MS,
        }
    }

    fn scripted(
        counter: &Arc<AtomicU32>,
        status: StatusCode,
    ) -> impl FnMut() -> futures_util::future::BoxFuture<'static, TransportResult> {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(UpstreamResponse::new(status, "")) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let report = policy(3).run(scripted(&calls, StatusCode::OK)).await;
        assert_eq!(report.attempts, 1);
        assert!(report.result.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_status_uses_all_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let report = policy(2)
            .run(scripted(&calls, StatusCode::SERVICE_UNAVAILABLE))
            .await;
        assert_eq!(report.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.result.unwrap().status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let report = policy(0)
            .run(scripted(&calls, StatusCode::TOO_MANY_REQUESTS))
            .await;
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_means_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut p = policy(5);
        p.enabled = false;
        let report = p.run(scripted(&calls, StatusCode::BAD_GATEWAY)).await;
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_statuses_are_not_retried() {
        for status in [StatusCode::FORBIDDEN, StatusCode::NOT_FOUND] {
            let calls = Arc::new(AtomicU32::new(0));
            let report = policy(3).run(scripted(&calls, status)).await;
            assert_eq!(report.attempts, 1, "{status} must not be retried");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempts_time_out_and_respect_total_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let start = Instant::now();

        let report = policy(10)
            .run(move || {
                c.fetch_add(1, Ordering::SeqCst);
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(UpstreamResponse::new(StatusCode::OK, ""))
                }) as futures_util::future::BoxFuture<'static, TransportResult>
            })
            .await;

        assert!(matches!(report.result, Err(TransportError::Timeout)));
        // 1.5s + ~0.2s + 1.5s + ~0.2s, then the third attempt gets what is left.
        assert_eq!(report.attempts, 3);
        assert!(start.elapsed() <= Duration::from_millis(4_000) + Duration::from_millis(300));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_recovers() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let report = policy(1)
            .run(move || {
                let n = c.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    if n == 0 {
                        Err(TransportError::Connect("refused".into()))
                    } else {
                        Ok(UpstreamResponse::new(StatusCode::OK, "body"))
                    }
                }) as futures_util::future::BoxFuture<'static, TransportResult>
            })
            .await;

        assert_eq!(report.attempts, 2);
        assert_eq!(report.result.unwrap().body, "body");
    }
}
