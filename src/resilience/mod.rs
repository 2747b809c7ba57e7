//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Direct attempt:
//!     → circuit_breaker.rs (admit: direct, probe, or skip)
//!     → retries.rs (bounded attempts within a total budget)
//!         → timeouts.rs (per-attempt deadline, detached on expiry)
//!         → throttle.rs (windowed FIFO, when a limit applies)
//!         → backoff.rs (jittered pause between attempts)
//!     → circuit_breaker.rs (record success / failure)
//! ```
//!
//! # Design Decisions
//! - Every direct attempt has a deadline
//! - Only transient failures are retried
//! - One breaker and one throttle queue per pipeline, shared by all requests

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod throttle;
pub mod timeouts;

pub use circuit_breaker::{Admission, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use retries::{RetryPolicy, RetryReport};
pub use throttle::{RequestThrottler, ThrottleWindow};
pub use timeouts::{with_deadline, DeadlineError};
