//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that round-trips the catalog store

use crate::handlers::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

/// `GET /healthz`
///
/// Very small liveness probe. Always returns 200 OK and never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
            error: None,
        }),
    )
}

/// `GET /readyz`
///
/// Asks the configured backend for a cheap round-trip. HTTP 200 when it
/// answers, HTTP 503 with the error otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.catalog.store().health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                error: None,
            }),
        ),
        Err(err) => {
            tracing::warn!("readiness check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error".into(),
                    error: Some(err.to_string()),
                }),
            )
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
