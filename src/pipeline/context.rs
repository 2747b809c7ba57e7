//! Per-call request context.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use uuid::Uuid;

use crate::upstream::headers;
use crate::upstream::UpstreamRequest;

/// Transport options a caller may set for one request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Ceiling for each individual exchange, on top of the retry deadlines.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            timeout: None,
        }
    }
}

/// Everything one logical request needs, owned by that request alone.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub url: String,
    /// Headers the caller asked for, before merging with the client profile.
    pub caller_headers: HeaderMap,
    /// Client profile with the caller's headers applied on top.
    pub headers: HeaderMap,
    pub options: RequestOptions,
    /// Per-call throttle window size.
    pub limit: Option<usize>,
}

impl RequestContext {
    pub fn new(
        url: impl Into<String>,
        caller_headers: HeaderMap,
        options: RequestOptions,
        limit: Option<usize>,
    ) -> Self {
        let request_id = Uuid::new_v4();
        let headers = headers::merge(headers::primary_profile(request_id), &caller_headers);
        Self {
            request_id,
            url: url.into(),
            caller_headers,
            headers,
            options,
            limit,
        }
    }

    /// The direct-path exchange for this request.
    pub fn direct_request(&self) -> UpstreamRequest {
        UpstreamRequest {
            url: self.url.clone(),
            method: self.options.method.clone(),
            headers: self.headers.clone(),
            timeout: self.options.timeout,
        }
    }
}
