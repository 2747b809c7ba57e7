//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the store routes
//! - Wire up middleware (CORS, API key, timeout, tracing)
//! - Serve on a listener until shutdown is triggered

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, Method, StatusCode};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::auth::{api_key_middleware, API_KEY_HEADER};
use crate::http::handlers;
use crate::http::response::json_timeout;
use crate::lifecycle::Shutdown;
use crate::store::StoreClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: StoreClient,
    pub api_key: Option<Arc<str>>,
}

/// HTTP server for the metadata API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(store: StoreClient, config: &ServerConfig) -> Self {
        let state = AppState {
            store,
            api_key: config.api_key.as_deref().filter(|k| !k.is_empty()).map(Arc::from),
        };
        if state.api_key.is_none() {
            tracing::warn!("No API key configured, all requests are accepted");
        }

        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)]);

        Router::new()
            .route("/app/{id}", get(handlers::get_app))
            .route("/developer/{dev_id}", get(handlers::get_developer))
            .route("/health", get(handlers::health))
            .fallback(handlers::not_found)
            .layer(middleware::from_fn_with_state(state.clone(), api_key_middleware))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.request_timeout_secs),
            ))
            .layer(middleware::map_response(json_timeout))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` is triggered, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
