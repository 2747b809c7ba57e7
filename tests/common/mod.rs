//! Shared utilities for integration tests: raw TCP mock upstreams and a
//! pipeline wired to the real reqwest transport.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use store_fetch::config::{FallbackConfig, PipelineConfig};
use store_fetch::fallback::FallbackChain;
use store_fetch::upstream::{ReqwestTransport, Transport};
use store_fetch::Pipeline;

/// What the mock upstream saw.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Path and query, as sent on the request line.
    pub target: String,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::with_capacity(2048);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    let mut lines = head.split("\r\n");
    let target = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers: Vec<(String, String)> = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let user_agent = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
        .map(|(_, v)| v.clone())
        .unwrap_or_default();

    Some(MockRequest {
        target,
        user_agent,
        headers,
    })
}

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` sees each request and returns the status and body to answer with.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A reqwest transport that never goes through a system proxy.
pub fn transport() -> Arc<dyn Transport> {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    Arc::new(ReqwestTransport::from_client(client))
}

/// Pipeline with the standard fallback chain, relaying through
/// `http://{relay}/relay`.
pub fn pipeline(relay: SocketAddr, config: PipelineConfig) -> Pipeline {
    let transport = transport();
    let fallback = FallbackChain::standard(
        transport.clone(),
        &FallbackConfig {
            enabled: true,
            relay_url: format!("http://{relay}/relay"),
        },
    )
    .unwrap();
    Pipeline::new(transport, fallback, config)
}

/// Lookup response body with one software record per id.
pub fn lookup_body(ids: &[u64]) -> String {
    let results: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "wrapperType": "software",
                "trackId": id,
                "bundleId": format!("test.app{id}"),
                "trackName": format!("App {id}"),
                "price": 0.0,
                "releaseDate": "2020-01-01T00:00:00Z"
            })
        })
        .collect();
    serde_json::json!({ "resultCount": results.len(), "results": results }).to_string()
}
