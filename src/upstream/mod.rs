//! Upstream access primitives.
//!
//! # Data Flow
//! ```text
//! pipeline / fallback stages
//!     → headers.rs (client profile + caller overrides)
//!     → transport.rs (UpstreamRequest → UpstreamResponse | TransportError)
//!     → error.rs (classify failures, build FetchError)
//! ```

pub mod error;
pub mod headers;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorClass, FetchError, FetchResult};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportResult, UpstreamRequest,
    UpstreamResponse,
};
