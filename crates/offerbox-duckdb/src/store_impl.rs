use async_trait::async_trait;

use offerbox_core::lead::{NewOffer, Offer, Visit};
use offerbox_core::store::LeadStore;

use crate::DuckDbBackend;

#[async_trait]
impl LeadStore for DuckDbBackend {
    async fn insert_visit(&self, visit: &Visit) -> anyhow::Result<()> {
        DuckDbBackend::insert_visit(self, visit).await
    }

    async fn insert_offer(&self, offer: &NewOffer) -> anyhow::Result<Offer> {
        DuckDbBackend::insert_offer(self, offer).await
    }

    async fn count_visits(&self) -> anyhow::Result<i64> {
        DuckDbBackend::count_visits(self).await
    }

    async fn count_offers(&self) -> anyhow::Result<i64> {
        DuckDbBackend::count_offers(self).await
    }

    async fn recent_offers(&self, limit: usize) -> anyhow::Result<Vec<Offer>> {
        DuckDbBackend::recent_offers(self, limit).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }
}
