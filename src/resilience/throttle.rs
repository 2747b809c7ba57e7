//! Windowed request throttler.
//!
//! # Responsibilities
//! - Queue direct attempts in one FIFO shared by the whole pipeline
//! - Issue them in batches of at most `requests` concurrent exchanges
//! - Pause `interval` between batches while work is still queued
//!
//! # Design Decisions
//! - A single drain task at a time, guarded by the `processing` flag, which is
//!   set and cleared under the same lock as the queue so no wake-up is lost
//! - Window size is last-writer-wins: a caller's per-call limit applies to the
//!   shared queue, so one aggressive limit changes everyone's pacing
//! - Each submission resolves exactly once; a caller that stopped waiting
//!   (deadline) is skipped silently when its result arrives

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::oneshot;

use crate::config::ThrottlingConfig;
use crate::observability::metrics;
use crate::upstream::{Transport, TransportError, TransportResult, UpstreamRequest};

/// Batch size and pacing for the shared queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleWindow {
    pub requests: usize,
    pub interval: Duration,
}

impl ThrottleWindow {
    /// Window from configuration, with an optional per-call size override.
    pub fn resolve(config: &ThrottlingConfig, limit: Option<usize>) -> Self {
        let configured = usize::try_from(config.requests).unwrap_or(usize::MAX);
        Self {
            requests: limit.unwrap_or(configured).max(1),
            interval: Duration::from_millis(config.interval_ms),
        }
    }
}

struct Pending {
    request: UpstreamRequest,
    reply: oneshot::Sender<TransportResult>,
}

struct QueueState {
    pending: VecDeque<Pending>,
    processing: bool,
    window: ThrottleWindow,
}

/// Shared FIFO of throttled direct attempts.
pub struct RequestThrottler {
    transport: Arc<dyn Transport>,
    state: Mutex<QueueState>,
}

impl RequestThrottler {
    pub fn new(transport: Arc<dyn Transport>, window: ThrottleWindow) -> Self {
        Self {
            transport,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                processing: false,
                window,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().expect("throttle queue mutex poisoned")
    }

    /// Requests waiting for a batch slot.
    pub fn queued(&self) -> usize {
        self.lock().pending.len()
    }

    /// Queue `request` and return a future for its result.
    ///
    /// The request is enqueued immediately; the returned future only waits.
    pub fn submit(
        self: &Arc<Self>,
        request: UpstreamRequest,
        window: ThrottleWindow,
    ) -> impl Future<Output = TransportResult> + Send + 'static {
        let (reply, rx) = oneshot::channel();

        let start_drain = {
            let mut state = self.lock();
            state.window = window;
            state.pending.push_back(Pending { request, reply });
            metrics::record_queue_depth(state.pending.len());
            if state.processing {
                false
            } else {
                state.processing = true;
                true
            }
        };

        if start_drain {
            tokio::spawn(self.clone().drain());
        }

        async move {
            rx.await.unwrap_or_else(|_| {
                Err(TransportError::Other(
                    "throttled request dropped before completion".to_string(),
                ))
            })
        }
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let (batch, interval) = {
                let mut state = self.lock();
                let take = state.window.requests.min(state.pending.len());
                let batch: Vec<Pending> = state.pending.drain(..take).collect();
                metrics::record_queue_depth(state.pending.len());
                (batch, state.window.interval)
            };

            tracing::trace!(batch = batch.len(), "Draining throttle batch");

            let exchanges = batch.into_iter().map(|pending| {
                let exchange = self.transport.send(pending.request);
                tokio::spawn(async move {
                    let _ = pending.reply.send(exchange.await);
                })
            });
            for joined in join_all(exchanges).await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Throttled exchange task failed");
                }
            }

            {
                let mut state = self.lock();
                if state.pending.is_empty() {
                    state.processing = false;
                    return;
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::testing::ScriptedTransport;
    use crate::upstream::UpstreamResponse;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use tokio::time::Instant;

    fn window(requests: usize, interval_ms: u64) -> ThrottleWindow {
        ThrottleWindow {
            requests,
            interval: Duration::from_millis(interval_ms),
        }
    }

    fn slow_transport() -> Arc<ScriptedTransport> {
        ScriptedTransport::new(|_, _| {
            (
                Duration::from_millis(50),
                Ok(UpstreamResponse::new(StatusCode::OK, "ok")),
            )
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_caps_concurrency_and_spaces_batches() {
        let transport = slow_transport();
        let throttler = Arc::new(RequestThrottler::new(transport.clone(), window(3, 1_000)));

        let futures: Vec<_> = (0..7)
            .map(|i| {
                throttler.submit(
                    UpstreamRequest::get(format!("http://upstream/{i}"), HeaderMap::new()),
                    window(3, 1_000),
                )
            })
            .collect();
        let results = join_all(futures).await;

        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|r| r.is_ok())));
        assert_eq!(transport.calls(), 7);
        assert_eq!(transport.max_in_flight(), 3);

        let seen = transport.seen();
        let batch_starts: Vec<Instant> = vec![seen[0].started_at, seen[3].started_at, seen[6].started_at];
        for pair in batch_starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1_000));
        }
        // Members of one batch start together.
        assert_eq!(seen[0].started_at, seen[2].started_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_admission_order() {
        let transport = slow_transport();
        let throttler = Arc::new(RequestThrottler::new(transport.clone(), window(2, 100)));

        let futures: Vec<_> = (0..5)
            .map(|i| {
                throttler.submit(
                    UpstreamRequest::get(format!("http://upstream/{i}"), HeaderMap::new()),
                    window(2, 100),
                )
            })
            .collect();
        join_all(futures).await;

        let order: Vec<String> = transport.seen().into_iter().map(|s| s.request.url).collect();
        let expected: Vec<String> = (0..5).map(|i| format!("http://upstream/{i}")).collect();
        assert_eq!(order, expected);
        assert_eq!(throttler.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_queue_restarts_processing() {
        let transport = slow_transport();
        let throttler = Arc::new(RequestThrottler::new(transport.clone(), window(1, 500)));

        let first = throttler
            .submit(UpstreamRequest::get("http://upstream/a", HeaderMap::new()), window(1, 500))
            .await;
        assert!(first.is_ok());

        tokio::time::sleep(Duration::from_secs(2)).await;

        let second = throttler
            .submit(UpstreamRequest::get("http://upstream/b", HeaderMap::new()), window(1, 500))
            .await;
        assert!(second.is_ok());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_delivered() {
        let transport = ScriptedTransport::new(|_, _| {
            (Duration::ZERO, Err(TransportError::Connect("refused".into())))
        });
        let throttler = Arc::new(RequestThrottler::new(transport, window(5, 100)));

        let result = throttler
            .submit(UpstreamRequest::get("http://upstream/x", HeaderMap::new()), window(5, 100))
            .await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[test]
    fn test_window_resolution() {
        let config = ThrottlingConfig {
            enabled: true,
            requests: 10,
            interval_ms: 250,
        };
        assert_eq!(ThrottleWindow::resolve(&config, None), window(10, 250));
        assert_eq!(ThrottleWindow::resolve(&config, Some(2)), window(2, 250));
        assert_eq!(ThrottleWindow::resolve(&config, Some(0)).requests, 1);
    }
}
