//! Route handlers.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::store::App;

#[derive(Debug, Default, Deserialize)]
pub struct AppParams {
    pub country: Option<String>,
    pub lang: Option<String>,
}

/// `GET /app/{id}`: numeric track id or bundle id.
pub async fn get_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<AppParams>,
) -> Result<Json<App>, ApiError> {
    tracing::info!(id = %id, country = ?params.country, "Requesting app");

    match state
        .store
        .app(&id, params.country.as_deref(), params.lang.as_deref())
        .await
    {
        Ok(app) => Ok(Json(app)),
        Err(e) => {
            tracing::error!(id = %id, error = %e, "Error in /app/{{id}} route");
            Err(e.into())
        }
    }
}

/// `GET /developer/{dev_id}`: every app by one developer.
pub async fn get_developer(
    State(state): State<AppState>,
    Path(dev_id): Path<String>,
    Query(params): Query<AppParams>,
) -> Result<Json<Vec<App>>, ApiError> {
    tracing::info!(dev_id = %dev_id, country = ?params.country, "Requesting developer");

    match state
        .store
        .developer(&dev_id, params.country.as_deref(), params.lang.as_deref())
        .await
    {
        Ok(apps) => Ok(Json(apps)),
        Err(e) => {
            tracing::error!(dev_id = %dev_id, error = %e, "Error in /developer/{{dev_id}} route");
            Err(e.into())
        }
    }
}

/// `GET /health`: breaker state and live tuning.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = state.store.pipeline();
    Json(json!({
        "status": "ok",
        "breaker": pipeline.breaker_snapshot(),
        "config": *pipeline.config(),
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
