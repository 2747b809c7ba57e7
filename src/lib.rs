//! Resilient App Store metadata fetching.
//!
//! Every upstream call goes through one [`Pipeline`]: a circuit breaker in
//! front of a retried, optionally throttled direct request, with a chain of
//! fallback strategies behind it. [`StoreClient`] builds App Store lookups on
//! top of the pipeline and [`HttpServer`] exposes them over HTTP.

// Core
pub mod config;
pub mod pipeline;
pub mod upstream;

// Failure handling
pub mod fallback;
pub mod resilience;

// Surfaces
pub mod http;
pub mod store;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::{AppConfig, ConfigPatch, PipelineConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Pipeline, RequestOptions};
pub use store::{LookupQuery, StoreClient};
pub use upstream::{FetchError, FetchResult};
