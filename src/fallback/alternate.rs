//! Re-issue the URL directly with a different client profile.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::fallback::{FallbackError, FallbackStrategy};
use crate::pipeline::RequestContext;
use crate::upstream::headers::alternate_profile;
use crate::upstream::{Transport, UpstreamRequest};

pub struct AlternateHeaders {
    transport: Arc<dyn Transport>,
}

impl AlternateHeaders {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl FallbackStrategy for AlternateHeaders {
    fn name(&self) -> &'static str {
        "alternate_headers"
    }

    fn fetch<'a>(&'a self, ctx: &'a RequestContext) -> BoxFuture<'a, Result<String, FallbackError>> {
        Box::pin(async move {
            let mut request = UpstreamRequest::get(ctx.url.clone(), alternate_profile());
            request.timeout = ctx.options.timeout;

            let response = self.transport.send(request).await?;
            if response.is_ok() {
                Ok(response.body)
            } else {
                Err(FallbackError::Status(response.status.as_u16()))
            }
        })
    }
}
