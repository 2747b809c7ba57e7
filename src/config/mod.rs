//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks on static sections)
//!     → AppConfig (server, observability, transport, fallback)
//!     → pipeline sections as ConfigPatch
//!     → store.rs merges onto PipelineConfig::default()
//!
//! At runtime:
//!     configure(patch) or watcher.rs reload
//!     → patch.rs merges present fields, drops malformed numbers
//!     → atomic swap of Arc<PipelineConfig>
//!     → next request reads the new snapshot
//! ```
//!
//! # Design Decisions
//! - Static sections are validated and rejected loudly at startup
//! - Pipeline tuning never fails; invalid input keeps the previous value
//! - Nothing resets the live configuration except an explicit patch

pub mod loader;
pub mod patch;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use patch::{BreakerPatch, ConfigPatch, FlagInput, NumericInput, RetryPatch, ThrottlingPatch};
pub use schema::{
    AppConfig, BreakerConfig, FallbackConfig, LogFormat, ObservabilityConfig, PipelineConfig,
    RetryConfig, ServerConfig, StoreConfig, ThrottlingConfig, TransportConfig,
};
pub use store::ConfigStore;
pub use watcher::ConfigWatcher;
