//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! client request
//!     → CORS (preflight answered here)
//!     → auth.rs (x-api-key, when configured)
//!     → handlers.rs (/app/{id}, /health)
//!         → StoreClient → Pipeline
//!     → response.rs (JSON body or {"error": ...})
//! ```

pub mod auth;
pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
