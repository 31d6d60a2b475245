//! Per-IP fixed-window rate limiting for offer submissions.
//!
//! The algorithm lives in [`RateLimiter`]; counters live behind
//! [`RateLimitStore`] so a shared store with expiring keys can replace the
//! in-process map when running more than one instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::{client::ClientInfo, error::AppError, state::AppState};

/// Entries beyond this count trigger a sweep of expired windows, at most
/// once per window length.
const SWEEP_THRESHOLD: usize = 10_000;

/// Counter state for one key after registering a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Requests seen in the current window, including this one.
    pub count: u32,
    /// Time until the current window expires.
    pub resets_in: Duration,
}

/// Storage for fixed-window counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync + 'static {
    /// Count one request for `key`, opening a new window of length `window`
    /// when none is active.
    async fn hit(&self, key: &str, window: Duration) -> anyhow::Result<WindowHit>;
}

struct FixedWindow {
    started: Instant,
    count: u32,
}

#[derive(Default)]
struct Windows {
    by_key: HashMap<String, FixedWindow>,
    last_sweep: Option<Instant>,
}

/// Process-local counters. Reset on restart, not shared between instances.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<Windows>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.by_key.len()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(&self, key: &str, window: Duration) -> anyhow::Result<WindowHit> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let sweep_due = windows
            .last_sweep
            .map_or(true, |at| now.duration_since(at) >= window);
        if windows.by_key.len() >= SWEEP_THRESHOLD && sweep_due {
            windows
                .by_key
                .retain(|_, w| now.duration_since(w.started) < window);
            windows.last_sweep = Some(now);
        }

        let entry = windows.by_key.entry(key.to_string()).or_insert(FixedWindow {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count = entry.count.saturating_add(1);

        Ok(WindowHit {
            count: entry.count,
            resets_in: window.saturating_sub(now.duration_since(entry.started)),
        })
    }
}

/// Result of checking one request against the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub resets_in: Duration,
}

impl RateLimitDecision {
    /// `RateLimit-Limit`, `RateLimit-Remaining` and `RateLimit-Reset` (seconds).
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        let pairs = [
            ("ratelimit-limit", self.limit.to_string()),
            ("ratelimit-remaining", self.remaining.to_string()),
            ("ratelimit-reset", reset_seconds(self.resets_in).to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
    }
}

fn reset_seconds(d: Duration) -> u64 {
    // Round up so clients never retry a fraction of a second too early.
    d.as_millis().div_ceil(1000) as u64
}

/// Fixed-window limiter: `max` requests per key per `window`.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    /// `max = 0` disables the limiter.
    pub fn new(store: Arc<dyn RateLimitStore>, max: u32, window: Duration) -> Self {
        Self { store, max, window }
    }

    pub fn in_memory(max: u32, window: Duration) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), max, window)
    }

    pub fn is_enabled(&self) -> bool {
        self.max > 0
    }

    /// Returns `None` when disabled. A failing store lets the request through.
    pub async fn check(&self, key: &str) -> Option<RateLimitDecision> {
        if !self.is_enabled() {
            return None;
        }
        match self.store.hit(key, self.window).await {
            Ok(hit) => Some(RateLimitDecision {
                allowed: hit.count <= self.max,
                limit: self.max,
                remaining: self.max.saturating_sub(hit.count),
                resets_in: hit.resets_in,
            }),
            Err(e) => {
                error!(key, error = %e, "Rate limit store failed; allowing request");
                None
            }
        }
    }
}

/// Middleware guarding `POST /api/send-offer`.
///
/// Rejections are answered here, before the handler runs.
pub async fn limit_offer_submissions(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    request: Request,
    next: Next,
) -> Response {
    let key = client.rate_limit_key();
    let Some(decision) = state.offer_limiter.check(&key).await else {
        return next.run(request).await;
    };

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!(ip = %key, "Offer submission rate limited");
        AppError::RateLimited {
            retry_after_seconds: reset_seconds(decision.resets_in),
        }
        .into_response()
    };
    decision.apply_headers(response.headers_mut());
    response
}
