use std::sync::Arc;

use offerbox_core::{config::Config, notify::OfferNotifier, store::LeadStore};

use crate::{client::TrustedProxies, geo::GeoResolver, rate_limit::RateLimiter};

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Persistence gateway. `None` when no database is configured; routes
    /// that need it answer with a fixed configuration error.
    pub store: Option<Arc<dyn LeadStore>>,

    /// Mail gateway. `None` when mail credentials are missing.
    pub notifier: Option<Arc<dyn OfferNotifier>>,

    pub geo: GeoResolver,

    /// Fixed-window limiter guarding `POST /api/send-offer`.
    pub offer_limiter: RateLimiter,

    /// Peers whose `X-Forwarded-For` decides the rate-limit key.
    pub trusted_proxies: TrustedProxies,
}

impl AppState {
    /// Build state with an in-process rate limiter and a geolocation client
    /// configured from `config`.
    pub fn new(
        config: Config,
        store: Option<Arc<dyn LeadStore>>,
        notifier: Option<Arc<dyn OfferNotifier>>,
    ) -> Self {
        let geo = GeoResolver::new(&config.geoip_url, config.outbound_timeout());
        let offer_limiter =
            RateLimiter::in_memory(config.rate_limit_max, config.rate_limit_window());
        let trusted_proxies = TrustedProxies::parse(config.trusted_proxies.as_slice());
        Self {
            config: Arc::new(config),
            store,
            notifier,
            geo,
            offer_limiter,
            trusted_proxies,
        }
    }

    /// Exact plaintext comparison. An unset password matches nothing.
    pub fn reports_password_matches(&self, candidate: &str) -> bool {
        self.config
            .reports_password
            .as_deref()
            .is_some_and(|expected| expected == candidate)
    }
}
