//! Fallback chain.
//!
//! # Data Flow
//! ```text
//! direct path blocked (403/429/5xx) or no response
//!     → alternate.rs (same URL, App Store client headers)
//!     → relay.rs (content relay fetches the URL server-side)
//!     → first body wins; otherwise the caller re-raises the direct failure
//! ```
//!
//! # Design Decisions
//! - Stages are an ordered list of strategies, extended by appending
//! - Each stage runs once, unthrottled and unretried, under its own deadline
//! - Stage failures are logged (rate-limited) and swallowed

pub mod alternate;
pub mod relay;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;

use crate::config::FallbackConfig;
use crate::observability::metrics::{self, FetchPath};
use crate::observability::warn_throttled;
use crate::pipeline::RequestContext;
use crate::upstream::{Transport, TransportError};

pub use alternate::AlternateHeaders;
pub use relay::RelayProxy;

const STAGE_WARN_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("stage returned status {0}")]
    Status(u16),

    #[error("unusable relay envelope: {0}")]
    Envelope(String),

    #[error("stage timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// One alternative way of retrieving a URL.
pub trait FallbackStrategy: Send + Sync {
    /// Stable identifier used in logs and metrics.
    fn name(&self) -> &'static str;

    fn fetch<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<String, FallbackError>>;
}

/// Ordered list of fallback stages.
#[derive(Clone, Default)]
pub struct FallbackChain {
    stages: Vec<Arc<dyn FallbackStrategy>>,
}

impl FallbackChain {
    /// An empty chain; the direct failure is always re-raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alternate headers, then the content relay.
    pub fn standard(
        transport: Arc<dyn Transport>,
        config: &FallbackConfig,
    ) -> Result<Self, url::ParseError> {
        if !config.enabled {
            return Ok(Self::new());
        }
        Ok(Self::new()
            .with(AlternateHeaders::new(transport.clone()))
            .with(RelayProxy::new(transport, &config.relay_url)?))
    }

    pub fn with(mut self, stage: impl FallbackStrategy + 'static) -> Self {
        self.push(Arc::new(stage));
        self
    }

    /// Append a stage after the existing ones.
    pub fn push(&mut self, stage: Arc<dyn FallbackStrategy>) {
        self.stages.push(stage);
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Try each stage in order, giving each at most `stage_timeout`.
    /// Returns the first body obtained.
    pub async fn run(&self, ctx: &RequestContext, stage_timeout: Duration) -> Option<String> {
        for stage in &self.stages {
            let name = stage.name();
            let started = Instant::now();
            tracing::debug!(request_id = %ctx.request_id, stage = name, url = %ctx.url, "Trying fallback stage");

            let result = tokio::time::timeout(stage_timeout, stage.fetch(ctx))
                .await
                .unwrap_or(Err(FallbackError::Timeout(stage_timeout)));

            match result {
                Ok(body) => {
                    metrics::record_attempt(FetchPath::Fallback(name), "ok");
                    tracing::info!(
                        request_id = %ctx.request_id,
                        stage = name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Fallback stage succeeded"
                    );
                    return Some(body);
                }
                Err(e) => {
                    metrics::record_attempt(FetchPath::Fallback(name), "error");
                    tracing::debug!(request_id = %ctx.request_id, stage = name, error = %e, "Fallback stage failed");
                    warn_throttled(
                        name,
                        STAGE_WARN_WINDOW,
                        format_args!("Fallback stage {name} failed: {e}"),
                    );
                }
            }
        }

        if !self.stages.is_empty() {
            warn_throttled(
                "all_fallbacks_failed",
                STAGE_WARN_WINDOW,
                "All alternative methods failed, falling back to original error",
            );
        }
        None
    }
}
