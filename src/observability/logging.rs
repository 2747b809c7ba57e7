//! Structured logging.
//!
//! Installs the `tracing` subscriber and provides a rate-limited warning
//! channel for conditions that repeat on every request while the upstream is
//! unhealthy (blocked direct path, breaker open, fallback failures).

use std::fmt::Display;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless;
/// the second install is ignored.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "store_fetch={level},tower_http={level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    last: Instant,
    suppressed: u64,
}

/// Per-key "at most once per window" gate.
#[derive(Debug, Default)]
pub struct WarnThrottle {
    buckets: DashMap<&'static str, Bucket>,
}

impl WarnThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(suppressed)` when a message for `key` may be emitted at
    /// `now`, where `suppressed` counts the messages swallowed since the last
    /// emission. Returns `None` while the window is still running.
    pub fn check(&self, key: &'static str, window: Duration, now: Instant) -> Option<u64> {
        let mut bucket = match self.buckets.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(Bucket {
                    last: now,
                    suppressed: 0,
                });
                return Some(0);
            }
            Entry::Occupied(occupied) => occupied.into_ref(),
        };

        if now.saturating_duration_since(bucket.last) >= window {
            let suppressed = bucket.suppressed;
            bucket.last = now;
            bucket.suppressed = 0;
            Some(suppressed)
        } else {
            bucket.suppressed += 1;
            None
        }
    }
}

fn global() -> &'static WarnThrottle {
    static THROTTLE: OnceLock<WarnThrottle> = OnceLock::new();
    THROTTLE.get_or_init(WarnThrottle::new)
}

/// Emit a `warn!` for `key` at most once per `window`.
pub fn warn_throttled(key: &'static str, window: Duration, message: impl Display) {
    if !tracing::enabled!(tracing::Level::WARN) {
        return;
    }
    if let Some(suppressed) = global().check(key, window, Instant::now()) {
        if suppressed > 0 {
            tracing::warn!(key, suppressed, "{message}");
        } else {
            tracing::warn!(key, "{message}");
        }
    }
}
