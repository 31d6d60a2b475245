use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use offerbox_core::{config::Config, kpi, notify::OfferNotifier, store::LeadStore};
use offerbox_duckdb::DuckDbBackend;
use offerbox_server::{mail::notifier_from_config, state::AppState};

/// `offerbox health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$OFFERBOX_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("OFFERBOX_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

/// `offerbox stats` — print the dashboard KPIs straight from the database.
async fn run_stats(cfg: &Config) -> Result<()> {
    let path = cfg
        .database_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("OFFERBOX_DATABASE_PATH is not set"))?;
    let db = DuckDbBackend::open(path, &cfg.duckdb_memory_limit)?;

    let visitors = db.count_visits().await?;
    let offers = db.count_offers().await?;
    let average = db.average_visit_seconds().await?.unwrap_or(0.0).round() as i64;

    println!("Total visitors:   {visitors}");
    println!("Total offers:     {offers}");
    println!("Average duration: {}", kpi::format_duration(average));
    println!(
        "Conversion rate:  {}",
        kpi::format_conversion_rate(visitors, offers)
    );
    Ok(())
}

fn open_store(cfg: &Config) -> Option<Arc<dyn LeadStore>> {
    let Some(path) = cfg.database_path.as_deref() else {
        warn!("OFFERBOX_DATABASE_PATH not set; visits and offers will not be stored");
        return None;
    };
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(path, error = %e, "Failed to create database directory");
            return None;
        }
    }
    match DuckDbBackend::open(path, &cfg.duckdb_memory_limit) {
        Ok(db) => Some(Arc::new(db)),
        Err(e) => {
            error!(path, error = %e, "Failed to open DuckDB; storage disabled");
            None
        }
    }
}

fn open_notifier(cfg: &Config) -> Option<Arc<dyn OfferNotifier>> {
    match notifier_from_config(cfg) {
        Ok(Some(notifier)) => Some(notifier),
        Ok(None) => {
            warn!("Mail credentials not set; offer submissions will be refused");
            None
        }
        Err(e) => {
            error!(error = %e, "Invalid mail configuration; offer submissions will be refused");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    dotenvy::dotenv().ok();

    // Initialise structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("offerbox=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env()?;

    if args.get(1).map(|s| s.as_str()) == Some("stats") {
        return run_stats(&cfg).await;
    }

    if cfg.reports_password.is_none() {
        warn!("OFFERBOX_REPORTS_PASSWORD not set; the dashboard will reject every password");
    }

    let store = open_store(&cfg);
    let notifier = open_notifier(&cfg);
    let port = cfg.port;

    let state = Arc::new(AppState::new(cfg, store, notifier));
    let app = offerbox_server::app::build_app(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(port, "Offerbox listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    Ok(())
}
