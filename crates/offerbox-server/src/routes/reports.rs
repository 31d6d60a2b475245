use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use offerbox_core::{lead::Offer, store::RECENT_OFFERS_LIMIT};

use crate::{error::AppError, state::AppState};

const ROUTE: &str = "/api/reports";

/// Dashboard payload.
///
/// `daily_stats` and `average_duration` are placeholders the dashboard
/// expects but nothing computes yet; they are always `{}` and `0`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsResponse {
    pub total_visitors: i64,
    pub total_offers: i64,
    pub recent_offers: Vec<Offer>,
    pub daily_stats: serde_json::Map<String, serde_json::Value>,
    pub average_duration: i64,
}

/// `GET /api/reports/{password}` — aggregated stats for the dashboard.
///
/// The password is checked before anything else, so a wrong password gets
/// `403` even when storage is not configured. A segment that does not decode
/// to UTF-8 cannot match and is answered the same way.
#[tracing::instrument(skip_all)]
pub async fn reports(
    State(state): State<Arc<AppState>>,
    password: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Ok(Path(password)) = password else {
        return Err(AppError::Forbidden);
    };
    if !state.reports_password_matches(&password) {
        return Err(AppError::Forbidden);
    }
    let store = state.store.clone().ok_or(AppError::StorageUnconfigured)?;

    let recent_offers = store
        .recent_offers(RECENT_OFFERS_LIMIT)
        .await
        .map_err(AppError::internal(ROUTE))?;
    let total_visitors = store
        .count_visits()
        .await
        .map_err(AppError::internal(ROUTE))?;
    let total_offers = store
        .count_offers()
        .await
        .map_err(AppError::internal(ROUTE))?;

    Ok(Json(ReportsResponse {
        total_visitors,
        total_offers,
        recent_offers,
        daily_stats: serde_json::Map::new(),
        average_duration: 0,
    }))
}
