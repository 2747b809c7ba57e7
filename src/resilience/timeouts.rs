//! Deadlines without cancellation.
//!
//! [`with_deadline`] spawns the operation as its own task and stops waiting
//! for it when the deadline passes. The task is detached, not aborted: it may
//! keep running (an HTTP exchange still in flight, a throttled slot still
//! queued) and its eventual result is dropped unread. Callers must tolerate
//! such late, discarded completions.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    /// Stopped waiting; the operation may still complete in the background.
    #[error("operation timeout after {}ms", .0.as_millis())]
    Elapsed(Duration),

    /// The operation's task panicked or was torn down with the runtime.
    #[error("operation aborted: {0}")]
    Aborted(String),
}

/// Wait for `operation` at most `deadline`.
pub async fn with_deadline<F, T>(operation: F, deadline: Duration) -> Result<T, DeadlineError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(operation);
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => Err(DeadlineError::Aborted(join_error.to_string())),
        // Dropping the JoinHandle detaches the task.
        Err(_) => Err(DeadlineError::Elapsed(deadline)),
    }
}
