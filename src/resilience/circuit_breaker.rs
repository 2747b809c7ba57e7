//! Circuit breaker for the direct path.
//!
//! # States
//! - Closed: normal operation, direct attempts pass through
//! - Open: upstream assumed to be blocking us, direct attempts are skipped
//! - Half-Open: still open, but a single probe is due
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures >= failure_threshold
//!                (open_until = now + open_ms, last_probe_at = now)
//! Open → Half-Open: now - last_probe_at >= half_open_probe_interval_ms
//! Half-Open → Open: probe granted (last_probe_at = now)
//! Any → Closed: recorded success (failures = 0, open_until cleared)
//! Open (expired) → Open: next failure re-opens with a fresh window
//! ```
//!
//! # Design Decisions
//! - One breaker per pipeline, shared by every request
//! - No timer: expiry and probing are evaluated lazily against `now`
//! - Failures while open never extend `open_until`
//! - A disabled breaker always admits and records nothing

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::{metrics, warn_throttled};

const OPEN_WARN_WINDOW: Duration = Duration::from_secs(60);

/// What the breaker reports at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Whether a caller may use the direct path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Breaker closed (or disabled).
    Direct,
    /// Breaker open, but this caller holds the probe for the current interval.
    Probe,
    /// Breaker open, skip the direct path.
    Rejected,
}

/// Point-in-time view for logs and the health route.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failures: u32,
    /// Remaining open time in milliseconds (0 when not open).
    pub open_for_ms: u64,
}

#[derive(Debug, Default)]
struct BreakerInner {
    failures: u32,
    open_until: Option<Instant>,
    last_probe_at: Option<Instant>,
}

impl BreakerInner {
    fn is_open(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }

    fn probe_due(&self, config: &BreakerConfig, now: Instant) -> bool {
        let interval = Duration::from_millis(config.half_open_probe_interval_ms);
        match self.last_probe_at {
            Some(at) => now.saturating_duration_since(at) >= interval,
            None => true,
        }
    }
}

/// Failure-suppression state for the direct path.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    /// Current state without side effects.
    pub fn state(&self, config: &BreakerConfig, now: Instant) -> BreakerState {
        if !config.enabled {
            return BreakerState::Closed;
        }
        let inner = self.lock();
        if !inner.is_open(now) {
            BreakerState::Closed
        } else if inner.probe_due(config, now) {
            BreakerState::HalfOpen
        } else {
            BreakerState::Open
        }
    }

    /// Decide whether the caller may attempt the direct path.
    ///
    /// Granting a probe stamps `last_probe_at` under the same lock, so at most
    /// one probe is handed out per probe interval.
    pub fn admit(&self, config: &BreakerConfig, now: Instant) -> Admission {
        if !config.enabled {
            return Admission::Direct;
        }
        let mut inner = self.lock();
        if !inner.is_open(now) {
            Admission::Direct
        } else if inner.probe_due(config, now) {
            inner.last_probe_at = Some(now);
            Admission::Probe
        } else {
            Admission::Rejected
        }
    }

    /// Count a direct-path failure. Returns true when this failure opened the
    /// breaker.
    pub fn record_failure(&self, config: &BreakerConfig, now: Instant) -> bool {
        if !config.enabled {
            return false;
        }
        let mut inner = self.lock();
        inner.failures = inner.failures.saturating_add(1);

        if inner.failures < config.failure_threshold || inner.is_open(now) {
            return false;
        }

        inner.open_until = Some(now + Duration::from_millis(config.open_ms));
        inner.last_probe_at = Some(now);
        let failures = inner.failures;
        drop(inner);

        metrics::record_breaker_open();
        tracing::debug!(failures, open_ms = config.open_ms, "Circuit breaker opened");
        warn_throttled(
            "breaker_open",
            OPEN_WARN_WINDOW,
            format_args!("Circuit breaker opened for {}ms", config.open_ms),
        );
        true
    }

    /// Any success closes the breaker.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.open_until.is_some() {
            tracing::info!(failures = inner.failures, "Circuit breaker closed");
        }
        inner.failures = 0;
        inner.open_until = None;
    }

    pub fn snapshot(&self, config: &BreakerConfig, now: Instant) -> BreakerSnapshot {
        let state = self.state(config, now);
        let inner = self.lock();
        let open_for_ms = match (state, inner.open_until) {
            (BreakerState::Closed, _) | (_, None) => 0,
            (_, Some(until)) => until.saturating_duration_since(now).as_millis() as u64,
        };
        BreakerSnapshot {
            state,
            failures: inner.failures,
            open_for_ms,
        }
    }
}
