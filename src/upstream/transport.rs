//! The HTTP transport primitive the pipeline is built on.
//!
//! Everything above this layer talks to a [`Transport`], never to reqwest
//! directly, so the throttler, retry loop and fallback stages can be driven by
//! a scripted transport in tests.

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::config::TransportConfig;

/// One outbound HTTP exchange.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    /// Per-exchange ceiling, on top of the client-wide one.
    pub timeout: Option<Duration>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers,
            timeout: None,
        }
    }
}

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 2xx.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }
}

/// No response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

pub type TransportResult = Result<UpstreamResponse, TransportError>;

/// Asynchronous fetch primitive.
///
/// The returned future owns everything it needs so it can be spawned and
/// outlive the caller that started it.
pub trait Transport: Send + Sync {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'static, TransportResult>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'static, TransportResult> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;

            Ok(UpstreamResponse {
                status,
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        })
    }
}
