//! Jittered backoff between retry attempts.

use std::time::Duration;

use rand::Rng;

/// Base delay between direct attempts.
pub const RETRY_BACKOFF_BASE_MS: u64 = 200;

/// Uniformly random delay in `[0.5 * base, 1.5 * base]`.
///
/// Spreads out callers that failed together so they do not retry in lockstep.
pub fn jittered_delay(base_ms: u64) -> Duration {
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let low = base_ms / 2;
    let high = base_ms + base_ms / 2;
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}
