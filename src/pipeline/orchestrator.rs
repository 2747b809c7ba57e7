//! Request orchestrator: the single entry point for upstream fetches.
//!
//! # Algorithm
//! ```text
//! request(url, headers, options, limit)
//!     → merge caller headers over the client profile
//!     → breaker.admit()
//!         Rejected → fallback chain → body | CircuitOpen
//!         Direct / Probe →
//!             retry loop around one (throttled?) exchange
//!             2xx        → breaker success → body
//!             other 4xx  → Http error (no fallback, no breaker penalty)
//!             403/429/5xx/no response
//!                        → breaker failure → fallback chain
//!                        → body | original failure
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::HeaderMap;
use tokio::time::Instant;

use crate::config::{AppConfig, ConfigPatch, ConfigStore, PipelineConfig};
use crate::fallback::FallbackChain;
use crate::observability::metrics::{self, FetchPath};
use crate::observability::warn_throttled;
use crate::pipeline::context::{RequestContext, RequestOptions};
use crate::resilience::{Admission, BreakerSnapshot, CircuitBreaker, RequestThrottler, RetryPolicy, ThrottleWindow};
use crate::upstream::{
    ErrorClass, FetchError, FetchResult, ReqwestTransport, Transport, TransportError,
    TransportResult, UpstreamResponse,
};

const DIRECT_WARN_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid relay URL: {0}")]
    RelayUrl(#[from] url::ParseError),
}

/// The resilient request pipeline.
///
/// Owns the process-wide breaker, throttle queue and live configuration.
/// Build one per process and share it behind an `Arc`.
pub struct Pipeline {
    config: ConfigStore,
    breaker: CircuitBreaker,
    throttler: Arc<RequestThrottler>,
    transport: Arc<dyn Transport>,
    fallback: FallbackChain,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, fallback: FallbackChain, initial: PipelineConfig) -> Self {
        let window = ThrottleWindow::resolve(&initial.throttling, None);
        Self {
            config: ConfigStore::new(initial),
            breaker: CircuitBreaker::new(),
            throttler: Arc::new(RequestThrottler::new(transport.clone(), window)),
            transport,
            fallback,
        }
    }

    /// Build the production pipeline: reqwest transport, standard fallback
    /// chain, and the file's tuning merged over the defaults.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.transport)?);
        let fallback = FallbackChain::standard(transport.clone(), &config.fallback)?;
        let initial = config.pipeline_patch().apply_to(&PipelineConfig::default());

        tracing::info!(
            fallback_stages = ?fallback.stage_names(),
            retries = initial.retry.retries,
            breaker_threshold = initial.breaker.failure_threshold,
            "Request pipeline initialized"
        );
        Ok(Self::new(transport, fallback, initial))
    }

    /// Merge a partial update into the live configuration.
    pub fn configure(&self, patch: &ConfigPatch) -> Arc<PipelineConfig> {
        self.config.configure(patch)
    }

    pub fn config(&self) -> Arc<PipelineConfig> {
        self.config.snapshot()
    }

    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.breaker.snapshot(&self.config.snapshot().breaker, Instant::now())
    }

    /// Fetch `url` and return the response body.
    pub async fn request(
        &self,
        url: &str,
        headers: HeaderMap,
        options: RequestOptions,
        limit: Option<usize>,
    ) -> FetchResult<String> {
        let started = std::time::Instant::now();
        let ctx = RequestContext::new(url, headers, options, limit);
        let config = self.config.snapshot();

        tracing::debug!(request_id = %ctx.request_id, url = %ctx.url, ?limit, "Making request");

        let result = self.execute(&ctx, &config).await;
        metrics::record_request_duration(started, result.is_ok());

        match &result {
            Ok(body) => tracing::debug!(
                request_id = %ctx.request_id,
                body_len = body.len(),
                "Request successful"
            ),
            Err(e) => tracing::error!(request_id = %ctx.request_id, error = %e, "Request failed"),
        }
        result
    }

    async fn execute(&self, ctx: &RequestContext, config: &PipelineConfig) -> FetchResult<String> {
        let direct = match self.breaker.admit(&config.breaker, Instant::now()) {
            Admission::Rejected => {
                tracing::debug!(request_id = %ctx.request_id, "Breaker open, skipping direct path");
                metrics::record_attempt(FetchPath::Direct, "skipped");
                None
            }
            admission => {
                if admission == Admission::Probe {
                    tracing::info!(request_id = %ctx.request_id, "Breaker open, probing upstream");
                }
                Some(self.direct(ctx, config).await)
            }
        };

        match direct {
            Some(Ok(response)) if response.is_ok() => {
                metrics::record_attempt(FetchPath::Direct, "ok");
                self.breaker.record_success();
                Ok(response.body)
            }
            Some(Ok(response)) => {
                let class = ErrorClass::of(response.status);
                metrics::record_attempt(FetchPath::Direct, class.as_str());
                tracing::debug!(
                    request_id = %ctx.request_id,
                    status = %response.status,
                    body = %response.body,
                    "Error response body"
                );
                if !class.triggers_fallback() {
                    return Err(http_error(response));
                }

                self.breaker.record_failure(&config.breaker, Instant::now());
                match class {
                    ErrorClass::Blocking => warn_throttled(
                        "blocked_403",
                        DIRECT_WARN_WINDOW,
                        "Primary request blocked, trying alternative methods...",
                    ),
                    _ => warn_throttled(
                        "primary_non_ok",
                        DIRECT_WARN_WINDOW,
                        format_args!(
                            "Primary request non-ok ({}), trying alternative methods...",
                            response.status.as_u16()
                        ),
                    ),
                }

                match self.fallback.run(ctx, stage_timeout(ctx, config)).await {
                    Some(body) => Ok(body),
                    None => Err(http_error(response)),
                }
            }
            Some(Err(e)) => {
                metrics::record_attempt(FetchPath::Direct, ErrorClass::Network.as_str());
                self.breaker.record_failure(&config.breaker, Instant::now());
                warn_throttled(
                    "direct_timeout",
                    DIRECT_WARN_WINDOW,
                    format_args!("Primary request timed out or failed ({e}), trying alternative methods..."),
                );

                match self.fallback.run(ctx, stage_timeout(ctx, config)).await {
                    Some(body) => Ok(body),
                    None => Err(FetchError::NoResponse {
                        reason: e.to_string(),
                    }),
                }
            }
            None => match self.fallback.run(ctx, stage_timeout(ctx, config)).await {
                Some(body) => Ok(body),
                None => Err(FetchError::CircuitOpen),
            },
        }
    }

    /// The retried, optionally throttled direct path.
    async fn direct(&self, ctx: &RequestContext, config: &PipelineConfig) -> TransportResult {
        let policy = RetryPolicy::from(&config.retry);
        let window = (ctx.limit.is_some() || config.throttling.enabled)
            .then(|| ThrottleWindow::resolve(&config.throttling, ctx.limit));

        let request = ctx.direct_request();
        let throttler = self.throttler.clone();
        let transport = self.transport.clone();

        let report = policy
            .run(move || -> BoxFuture<'static, TransportResult> {
                let request = request.clone();
                match window {
                    Some(window) => Box::pin(throttler.submit(request, window)),
                    None => transport.send(request),
                }
            })
            .await;

        let outcome = match &report.result {
            Ok(response) => response.status.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::debug!(
            request_id = %ctx.request_id,
            attempts = report.attempts,
            throttled = window.is_some(),
            %outcome,
            "Direct path finished"
        );
        report.result
    }
}

fn http_error(response: UpstreamResponse) -> FetchError {
    FetchError::Http {
        status: response.status.as_u16(),
        status_text: response.status_text,
        body: response.body,
    }
}

/// Deadline for one fallback stage: the per-attempt budget, tightened by a
/// caller-supplied exchange timeout.
fn stage_timeout(ctx: &RequestContext, config: &PipelineConfig) -> Duration {
    let budget = Duration::from_millis(config.retry.attempt_timeout_ms);
    ctx.options.timeout.map_or(budget, |t| t.min(budget))
}
