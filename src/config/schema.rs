//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Static sections derive Serde traits for deserialization from config files;
//! the pipeline tuning sections are read leniently as a [`ConfigPatch`] and
//! merged onto [`PipelineConfig::default`].

use serde::{Deserialize, Serialize};

use crate::config::patch::ConfigPatch;

/// Root configuration read from the TOML file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP surface settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Underlying HTTP client settings.
    pub transport: TransportConfig,

    /// Fallback chain settings.
    pub fallback: FallbackConfig,

    /// App Store endpoints.
    pub store: StoreConfig,

    /// Throttling tuning (partial, merged onto defaults).
    pub throttling: Option<crate::config::patch::ThrottlingPatch>,

    /// Retry tuning (partial, merged onto defaults).
    pub retry: Option<crate::config::patch::RetryPatch>,

    /// Breaker tuning (partial, merged onto defaults).
    pub breaker: Option<crate::config::patch::BreakerPatch>,
}

impl AppConfig {
    /// The pipeline tuning sections of the file as a patch.
    pub fn pipeline_patch(&self) -> ConfigPatch {
        ConfigPatch {
            throttling: self.throttling.clone(),
            retry: self.retry.clone(),
            breaker: self.breaker.clone(),
        }
    }
}

/// Live tuning of the request pipeline.
///
/// Mutated only through [`ConfigStore::configure`](crate::config::ConfigStore::configure).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub throttling: ThrottlingConfig,
    pub retry: RetryConfig,
    pub breaker: BreakerConfig,
}

/// Requests-per-window cap for direct attempts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottlingConfig {
    /// Throttle every direct attempt, not only calls that pass a limit.
    pub enabled: bool,

    /// Requests admitted per window.
    pub requests: u64,

    /// Window length in milliseconds.
    pub interval_ms: u64,
}

impl Default for ThrottlingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: 10,
            interval_ms: 1000,
        }
    }
}

/// Bounded retry with per-attempt and total deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Enable retries. When false exactly one attempt is made.
    pub enabled: bool,

    /// Retries after the first attempt.
    pub retries: u32,

    /// Deadline for a single attempt in milliseconds.
    pub attempt_timeout_ms: u64,

    /// Wall-clock budget for all attempts in milliseconds.
    pub total_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retries: 1,
            attempt_timeout_ms: 1500,
            total_timeout_ms: 4000,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreakerConfig {
    /// When false the breaker always reports closed.
    pub enabled: bool,

    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// How long the breaker stays open in milliseconds.
    pub open_ms: u64,

    /// Minimum spacing between probes while open, in milliseconds.
    pub half_open_probe_interval_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            open_ms: 120_000,
            half_open_probe_interval_ms: 30_000,
        }
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// When set, callers must send a matching `x-api-key` header.
    pub api_key: Option<String>,

    /// Deadline for a whole inbound request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format for log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics listener.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Settings for the underlying reqwest client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Hard ceiling for any single HTTP exchange in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 15_000,
        }
    }
}

/// Fallback chain configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Walk the fallback chain when the direct path is blocked or exhausted.
    pub enabled: bool,

    /// Content relay endpoint; the target URL is passed as `?url=`.
    pub relay_url: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            relay_url: "https://api.allorigins.win/get".to_string(),
        }
    }
}

/// App Store endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub lookup_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lookup_url: "https://itunes.apple.com/lookup".to_string(),
        }
    }
}
