//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, rate-limited warnings)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Logging is for diagnosis only; no control flow reads it
//! - Every logical request carries a request ID through its log lines
//! - Repeating upstream trouble is logged once per window, with a count

pub mod logging;
pub mod metrics;

pub use logging::warn_throttled;
