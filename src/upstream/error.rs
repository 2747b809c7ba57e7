//! Failure taxonomy and the error surfaced to callers.

use reqwest::StatusCode;

/// How a failed direct exchange is treated.
///
/// | Class | Retried | Fallback chain | Breaker failure |
/// |-------|---------|----------------|-----------------|
/// | `Blocking` (403) | No | Yes | Yes |
/// | `RateLimited` (429) | Yes | Yes | Yes |
/// | `Upstream` (5xx) | Yes | Yes | Yes |
/// | `Network` (no response) | Yes | Yes | Yes |
/// | `Client` (other non-2xx) | No | No | No |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Blocking,
    RateLimited,
    Upstream,
    Network,
    Client,
}

impl ErrorClass {
    /// Classify a non-2xx status.
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            403 => ErrorClass::Blocking,
            429 => ErrorClass::RateLimited,
            500..=599 => ErrorClass::Upstream,
            _ => ErrorClass::Client,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorClass::RateLimited | ErrorClass::Upstream | ErrorClass::Network
        )
    }

    /// Also decides whether a breaker failure is recorded.
    pub fn triggers_fallback(self) -> bool {
        !matches!(self, ErrorClass::Client)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Blocking => "blocked",
            ErrorClass::RateLimited => "rate_limited",
            ErrorClass::Upstream => "upstream_error",
            ErrorClass::Network => "no_response",
            ErrorClass::Client => "client_error",
        }
    }
}

/// The single error that crosses the pipeline boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The final response was not 2xx.
    #[error("HTTP {status}: {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// No response through any path.
    #[error("Primary request failed without response: {reason}")]
    NoResponse { reason: String },

    /// The breaker suppressed the direct path and no fallback succeeded.
    #[error("Direct path suppressed by open circuit breaker and no fallback succeeded")]
    CircuitOpen,
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
