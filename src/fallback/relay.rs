//! Fetch the URL through a server-side content relay.
//!
//! The relay is called as `GET {endpoint}?url=<target>` and answers with a
//! JSON envelope whose `contents` field holds the target's body.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Deserialize;
use url::Url;

use crate::fallback::{FallbackError, FallbackStrategy};
use crate::pipeline::RequestContext;
use crate::upstream::headers::relay_profile;
use crate::upstream::{Transport, UpstreamRequest};

#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    contents: Option<String>,
    status: Option<RelayStatus>,
}

#[derive(Debug, Deserialize)]
struct RelayStatus {
    http_code: Option<u16>,
}

pub struct RelayProxy {
    transport: Arc<dyn Transport>,
    endpoint: Url,
}

impl RelayProxy {
    pub fn new(transport: Arc<dyn Transport>, endpoint: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            transport,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// Relay URL for `target`, with the target percent-encoded.
    pub fn relay_url(&self, target: &str) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", target);
        url.into()
    }
}

fn unwrap_envelope(body: &str) -> Result<String, FallbackError> {
    let envelope: RelayEnvelope =
        serde_json::from_str(body).map_err(|e| FallbackError::Envelope(e.to_string()))?;

    if let Some(code) = envelope.status.and_then(|s| s.http_code) {
        if !(200..300).contains(&code) {
            return Err(FallbackError::Status(code));
        }
    }

    match envelope.contents {
        Some(contents) if !contents.is_empty() => Ok(contents),
        _ => Err(FallbackError::Envelope("missing contents".to_string())),
    }
}

impl FallbackStrategy for RelayProxy {
    fn name(&self) -> &'static str {
        "relay_proxy"
    }

    fn fetch<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<String, FallbackError>> {
        Box::pin(async move {
            let relay_url = self.relay_url(&ctx.url);
            tracing::debug!(request_id = %ctx.request_id, relay_url = %relay_url, "Using content relay");

            let mut request = UpstreamRequest::get(relay_url, relay_profile());
            request.timeout = ctx.options.timeout;

            let response = self.transport.send(request).await?;
            if !response.is_ok() {
                return Err(FallbackError::Status(response.status.as_u16()));
            }
            unwrap_envelope(&response.body)
        })
    }
}
