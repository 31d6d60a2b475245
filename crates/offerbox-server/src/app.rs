use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{rate_limit::limit_offer_submissions, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — permissive CORS for the landing page and dashboard.
///
/// The offer rate limiter is a route layer on `/api/send-offer` only.
/// Anything not matched by an API route is looked up in the embedded
/// static assets.
pub fn build_app(state: Arc<AppState>) -> Router {
    let offers = Router::new()
        .route("/api/send-offer", post(routes::offers::send_offer))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            limit_offer_submissions,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/log-duration", post(routes::visits::log_duration))
        .route("/api/reports/{password}", get(routes::reports::reports))
        .merge(offers)
        .fallback(routes::assets::static_asset)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
