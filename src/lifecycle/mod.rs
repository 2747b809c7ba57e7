//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber wakes
//!         → HTTP server stops accepting and drains in-flight requests
//!         → config watcher task exits
//! ```
//!
//! # Design Decisions
//! - One watch channel; any task can wait on it
//! - A trigger before a task subscribes is not lost

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
