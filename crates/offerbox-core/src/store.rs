//! Persistence gateway abstraction.

use async_trait::async_trait;

use crate::lead::{NewOffer, Offer, Visit};

/// Number of offers returned by the reports endpoint.
pub const RECENT_OFFERS_LIMIT: usize = 50;

/// Append-only storage for visits and offers.
///
/// The server only talks to this trait, so the embedded DuckDB backend can be
/// replaced by a hosted database without touching route handlers.
#[async_trait]
pub trait LeadStore: Send + Sync + 'static {
    async fn insert_visit(&self, visit: &Visit) -> anyhow::Result<()>;

    /// Store an offer numbered as `visit count + 1`.
    ///
    /// Implementations must perform the count and the insert as one unit so
    /// that concurrent submissions in the same process are numbered against a
    /// consistent visit count.
    async fn insert_offer(&self, offer: &NewOffer) -> anyhow::Result<Offer>;

    async fn count_visits(&self) -> anyhow::Result<i64>;

    async fn count_offers(&self) -> anyhow::Result<i64>;

    /// Most recent offers first, at most `limit` rows.
    async fn recent_offers(&self, limit: usize) -> anyhow::Result<Vec<Offer>>;

    /// Lightweight liveness check used by `/health`.
    async fn ping(&self) -> anyhow::Result<()> {
        self.count_visits().await.map(|_| ())
    }
}
