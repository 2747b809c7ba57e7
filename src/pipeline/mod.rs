//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! caller (HTTP route, lookup, CLI)
//!     → context.rs (request ID, merged headers, options)
//!     → orchestrator.rs
//!         → resilience (breaker, retries, throttle)
//!         → upstream transport
//!         → fallback chain on blocking or transient failure
//!     → body or FetchError
//! ```
//!
//! # Design Decisions
//! - Configuration is read once per request from an immutable snapshot
//! - Client errors other than 403/429 never touch the breaker or the fallbacks
//! - A failed fallback chain re-raises the direct failure, not the last stage's

pub mod context;
pub mod orchestrator;

pub use context::{RequestContext, RequestOptions};
pub use orchestrator::{Pipeline, PipelineError};
