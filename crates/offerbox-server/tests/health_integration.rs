use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use offerbox_core::config::Config;
use offerbox_core::lead::{NewOffer, Offer, Visit};
use offerbox_core::store::LeadStore;
use offerbox_duckdb::DuckDbBackend;
use offerbox_server::app::build_app;
use offerbox_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        database_path: None,
        duckdb_memory_limit: "1GB".to_string(),
        mail: None,
        smtp_noop: false,
        rate_limit_window_ms: 900_000,
        rate_limit_max: 5,
        reports_password: None,
        geoip_url: "http://127.0.0.1:9/json".to_string(),
        outbound_timeout_ms: 500,
        trusted_proxies: Vec::new(),
    }
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn text_body(response: axum::http::Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

struct UnreachableStore;

#[async_trait]
impl LeadStore for UnreachableStore {
    async fn insert_visit(&self, _visit: &Visit) -> anyhow::Result<()> {
        anyhow::bail!("database unreachable")
    }
    async fn insert_offer(&self, _offer: &NewOffer) -> anyhow::Result<Offer> {
        anyhow::bail!("database unreachable")
    }
    async fn count_visits(&self) -> anyhow::Result<i64> {
        anyhow::bail!("database unreachable")
    }
    async fn count_offers(&self) -> anyhow::Result<i64> {
        anyhow::bail!("database unreachable")
    }
    async fn recent_offers(&self, _limit: usize) -> anyhow::Result<Vec<Offer>> {
        anyhow::bail!("database unreachable")
    }
}

#[tokio::test]
async fn test_health_returns_200_when_db_reachable() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(test_config(), Some(Arc::new(db)), None));
    let app = build_app(state);

    let response = app.oneshot(get("/health")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["storage"], "ok");
}

#[tokio::test]
async fn test_health_reports_unconfigured_storage() {
    let app = build_app(Arc::new(AppState::new(test_config(), None, None)));

    let response = app.oneshot(get("/health")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "unconfigured");
}

#[tokio::test]
async fn test_health_returns_503_when_store_fails() {
    let state = AppState::new(test_config(), Some(Arc::new(UnreachableStore)), None);
    let app = build_app(Arc::new(state));

    let response = app.oneshot(get("/health")).await.expect("request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["status"], "degraded");
}

#[tokio::test]
async fn test_root_serves_landing_page() {
    let app = build_app(Arc::new(AppState::new(test_config(), None, None)));

    let response = app.oneshot(get("/")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    let html = text_body(response).await;
    assert!(html.contains("id=\"offer-form\""));
}

#[tokio::test]
async fn test_dashboard_served_with_and_without_extension() {
    let app = build_app(Arc::new(AppState::new(test_config(), None, None)));

    for uri in ["/dashboard", "/dashboard.html"] {
        let response = app.clone().oneshot(get(uri)).await.expect("request");
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let html = text_body(response).await;
        assert!(html.contains("id=\"password-overlay\""), "{uri}");
    }
}

#[tokio::test]
async fn test_scripts_carry_javascript_content_type() {
    let app = build_app(Arc::new(AppState::new(test_config(), None, None)));

    let response = app.oneshot(get("/script.js")).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/javascript; charset=utf-8"
    );
    let js = text_body(response).await;
    assert!(js.contains("/api/send-offer"));
    assert!(js.contains("sendBeacon"));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let app = build_app(Arc::new(AppState::new(test_config(), None, None)));

    for uri in ["/missing.txt", "/nowhere", "/api/unknown"] {
        let response = app.clone().oneshot(get(uri)).await.expect("request");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
