use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::json;

use offerbox_core::lead::{Visit, VisitBeacon};

use crate::{client::ClientInfo, error::AppError, state::AppState};

/// `POST /api/log-duration` — record one finished page session.
///
/// Fed by `navigator.sendBeacon` on unload, which posts `text/plain`, so the
/// body is read as raw bytes and parsed as JSON whatever the content type.
///
/// ## Response
/// `200 OK` with `{ "success": true }`. An unparsable body or a store failure
/// gives `500` with `{ "success": false }` and no visit row.
#[tracing::instrument(skip_all)]
pub async fn log_duration(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store.clone().ok_or(AppError::StorageUnconfigured)?;

    let beacon = VisitBeacon::parse(&body).map_err(|e| AppError::BeaconRejected(e.into()))?;
    let location = state.geo.locate(client.ip.as_deref()).await;

    store
        .insert_visit(&Visit {
            domain: client.host,
            ip: client.ip,
            user_agent: client.user_agent,
            location,
            duration_seconds: beacon.duration_seconds(),
        })
        .await
        .map_err(AppError::BeaconRejected)?;

    Ok(Json(json!({ "success": true })))
}
