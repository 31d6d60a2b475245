use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use offerbox_core::lead::{NewOffer, OfferSubmission};

use crate::{client::ClientInfo, error::AppError, state::AppState};

const ROUTE: &str = "/api/send-offer";

pub const MSG_OFFER_SENT: &str = "Offer sent successfully!";

/// `POST /api/send-offer` — store an offer and notify the site owner.
///
/// ## Rate limiting
/// Guarded by `limit_offer_submissions`; over-limit requests never get here.
///
/// ## Steps
/// Parse the form, resolve the caller's location, store the offer numbered
/// as `visit count + 1`, then send the notification email. A failure at any
/// step answers `500`; an offer that was stored before the email failed
/// stays stored.
#[tracing::instrument(skip_all)]
pub async fn send_offer(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let (Some(store), Some(notifier)) = (state.store.clone(), state.notifier.clone()) else {
        return Err(AppError::ConfigIncomplete);
    };

    let submission = OfferSubmission::parse(&body).map_err(AppError::internal(ROUTE))?;
    let location = state.geo.locate(client.ip.as_deref()).await;
    let duration_seconds = submission.duration_seconds();

    let offer = store
        .insert_offer(&NewOffer {
            name: submission.name,
            email: submission.email,
            comment: submission.comment,
            domain: client.host,
            location,
            ip: client.ip,
            user_agent: client.user_agent,
            duration_seconds,
        })
        .await
        .map_err(AppError::internal(ROUTE))?;

    notifier
        .notify_offer(&offer)
        .await
        .map_err(AppError::internal(ROUTE))?;

    info!(
        offer_id = offer.id,
        visitor_number = offer.visitor_number,
        "Offer received"
    );
    Ok(Json(json!({ "success": true, "message": MSG_OFFER_SENT })))
}
