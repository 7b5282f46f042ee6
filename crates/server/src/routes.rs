use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use mpk_transit::catalog::LINE_NOT_FOUND;
use mpk_transit::{LineIdentifier, TransitError, TransitSource};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

pub type SharedSource = Arc<dyn TransitSource>;

pub fn create_router(source: SharedSource) -> Router {
    Router::new()
        .route("/api/vehicles", get(vehicles))
        .route("/api/routes", get(lines))
        .route("/api/routes/{line}", get(route))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(source)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn upstream_failure(error: TransitError) -> Response {
    tracing::warn!(%error, "Upstream request failed");
    error_response(StatusCode::BAD_GATEWAY, error.to_string())
}

async fn vehicles(State(source): State<SharedSource>) -> Response {
    match source.vehicles().await {
        Ok(vehicles) => Json(vehicles).into_response(),
        Err(error) => upstream_failure(error),
    }
}

async fn lines(State(source): State<SharedSource>) -> Response {
    match source.lines().await {
        Ok(lines) => Json(lines).into_response(),
        Err(error) => upstream_failure(error),
    }
}

async fn route(State(source): State<SharedSource>, Path(line): Path<String>) -> Response {
    let line = LineIdentifier::new(line);
    match source.route(&line).await {
        Ok(response) => Json(response).into_response(),
        Err(TransitError::LineNotFound(_)) => error_response(StatusCode::NOT_FOUND, LINE_NOT_FOUND),
        Err(error) => upstream_failure(error),
    }
}

async fn health() -> &'static str {
    "OK"
}
