use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` — liveness check.
///
/// Returns `200 OK` when the store answers or is not configured at all (the
/// server is still up and serving the landing page). Returns
/// `503 Service Unavailable` when a configured store fails its ping.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0", "storage": "ok" }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(store) = &state.store else {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": "unconfigured"
            })),
        )
            .into_response();
    };

    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": "ok"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "version": env!("CARGO_PKG_VERSION"),
                    "storage": "error"
                })),
            )
                .into_response()
        }
    }
}
