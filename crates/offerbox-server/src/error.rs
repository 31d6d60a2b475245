use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const MSG_STORAGE_MISSING: &str = "Database configuration missing.";
pub const MSG_CONFIG_INCOMPLETE: &str = "Server configuration incomplete.";
pub const MSG_ACCESS_DENIED: &str = "Access denied.";
pub const MSG_RATE_LIMITED: &str = "Too many submissions. Please wait a moment and try again.";
pub const MSG_INTERNAL: &str = "An internal server error occurred.";

/// Application-level errors that map directly to HTTP responses.
///
/// Handlers return `Result<impl IntoResponse, AppError>`. Only the static
/// messages above ever reach the caller; the wrapped causes are logged.
#[derive(Debug, Error)]
pub enum AppError {
    /// No persistence gateway configured.
    #[error("storage is not configured")]
    StorageUnconfigured,

    /// Persistence or mail gateway missing for a route that needs both.
    #[error("server configuration incomplete")]
    ConfigIncomplete,

    #[error("forbidden")]
    Forbidden,

    #[error("rate limited")]
    RateLimited { retry_after_seconds: u64 },

    /// The duration beacon could not be recorded. Answered with a bare
    /// `{success:false}` since the browser never reads it.
    #[error("visit not recorded: {0}")]
    BeaconRejected(#[source] anyhow::Error),

    #[error("internal error in {route}: {source}")]
    Internal {
        route: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// `map_err` adapter tagging a failure with the route it happened in.
    pub fn internal<E>(route: &'static str) -> impl FnOnce(E) -> AppError
    where
        E: Into<anyhow::Error>,
    {
        move |e| AppError::Internal {
            route,
            source: e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::StorageUnconfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": MSG_STORAGE_MISSING })),
            )
                .into_response(),
            AppError::ConfigIncomplete => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": MSG_CONFIG_INCOMPLETE })),
            )
                .into_response(),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": MSG_ACCESS_DENIED })),
            )
                .into_response(),
            AppError::RateLimited {
                retry_after_seconds,
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "success": false, "message": MSG_RATE_LIMITED })),
                )
                    .into_response();
                if let Ok(value) = retry_after_seconds.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            AppError::BeaconRejected(e) => {
                tracing::error!(route = "/api/log-duration", error = %e, "Visit not recorded");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false })),
                )
                    .into_response()
            }
            AppError::Internal { route, source } => {
                tracing::error!(route, error = %source, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "message": MSG_INTERNAL })),
                )
                    .into_response()
            }
        }
    }
}
