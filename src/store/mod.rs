//! App Store metadata on top of the request pipeline.
//!
//! # Data Flow
//! ```text
//! StoreClient::app / lookup
//!     → lookup URL (ids, country, lang)
//!     → Pipeline::request
//!     → parse `results`, keep software records
//!     → app.rs (clean_app)
//! ```

pub mod app;
pub mod lookup;
pub mod markets;

pub use app::{clean_app, App, RawApp};
pub use lookup::{LookupError, LookupQuery, StoreClient};
pub use markets::{store_id, DEFAULT_STORE_ID};
