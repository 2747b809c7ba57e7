//! Configuration validation.
//!
//! Serde handles syntax; this checks the static sections that cannot be
//! repaired at runtime. Pipeline tuning is never rejected here, bad values
//! there are dropped when the patch is merged.

use std::net::SocketAddr;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

/// Returns every problem found, not just the first.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "server.bind_address",
            message: format!("'{}' is not a socket address", config.server.bind_address),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        });
    }

    if config.fallback.enabled {
        if let Err(e) = url::Url::parse(&config.fallback.relay_url) {
            errors.push(ValidationError {
                field: "fallback.relay_url",
                message: e.to_string(),
            });
        }
    }

    if let Err(e) = url::Url::parse(&config.store.lookup_url) {
        errors.push(ValidationError {
            field: "store.lookup_url",
            message: e.to_string(),
        });
    }

    if config.transport.request_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "transport.request_timeout_ms",
            message: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
