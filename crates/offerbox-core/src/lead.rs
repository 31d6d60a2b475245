use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Body of the unload-time beacon sent to `POST /api/log-duration`.
///
/// Browsers send beacons as `text/plain`, so the body is parsed from raw
/// bytes instead of relying on the request content type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitBeacon {
    /// Seconds on the page, as measured by the browser.
    pub duration: Option<f64>,
}

impl VisitBeacon {
    pub fn parse(body: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.duration.map(whole_seconds)
    }
}

/// The offer form as posted to `POST /api/send-offer`.
/// Wire names follow the landing page form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferSubmission {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "comentario")]
    pub comment: Option<String>,
    #[serde(rename = "durationOnSite")]
    pub duration_on_site: Option<f64>,
}

impl OfferSubmission {
    pub fn parse(body: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.duration_on_site.map(whole_seconds)
    }
}

/// A visit row ready to be appended to the `visits` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub domain: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub location: String,
    pub duration_seconds: Option<i64>,
}

/// An offer before the store has numbered and timestamped it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOffer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub comment: Option<String>,
    pub domain: Option<String>,
    pub location: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub duration_seconds: Option<i64>,
}

/// A stored offer, one row of the `offers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub comment: Option<String>,
    pub domain: Option<String>,
    /// Visit count at insert time + 1.
    pub visitor_number: i64,
    pub location: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: String,
}

fn whole_seconds(raw: f64) -> i64 {
    raw.round() as i64
}
