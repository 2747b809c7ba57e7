//! Scripted in-memory transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::upstream::{Transport, TransportResult, UpstreamRequest, UpstreamResponse};

type Responder = dyn Fn(&UpstreamRequest, usize) -> (Duration, TransportResult) + Send + Sync;

/// A request the transport saw, with the (paused-clock) time it started.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request: UpstreamRequest,
    pub started_at: Instant,
}

pub struct ScriptedTransport {
    responder: Box<Responder>,
    seen: Mutex<Vec<SeenRequest>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// `responder` gets the request and its zero-based call index and
    /// returns how long the exchange takes and what it yields.
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&UpstreamRequest, usize) -> (Duration, TransportResult) + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Every request answers `status` with `body` immediately.
    pub fn fixed(status: StatusCode, body: &'static str) -> Arc<Self> {
        Self::new(move |_, _| (Duration::ZERO, Ok(UpstreamResponse::new(status, body))))
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.request.url.starts_with(prefix))
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'static, TransportResult> {
        let index = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(SeenRequest {
                request: request.clone(),
                started_at: Instant::now(),
            });
            seen.len() - 1
        };
        let (delay, result) = (self.responder)(&request, index);

        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_in_flight.fetch_max(now, Ordering::SeqCst);

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}
