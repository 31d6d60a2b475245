use std::sync::Arc;

use offerbox_core::{
    lead::{NewOffer, Visit},
    store::{LeadStore, RECENT_OFFERS_LIMIT},
};
use offerbox_duckdb::DuckDbBackend;

fn sample_visit(duration: i64) -> Visit {
    Visit {
        domain: Some("example.ia.br".to_string()),
        ip: Some("200.1.2.3".to_string()),
        user_agent: Some("Mozilla/5.0 Chrome/120".to_string()),
        location: "Recife, Pernambuco, Brazil".to_string(),
        duration_seconds: Some(duration),
    }
}

fn sample_offer(name: &str) -> NewOffer {
    NewOffer {
        name: Some(name.to_string()),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        comment: Some("R$ 10.000".to_string()),
        domain: Some("example.ia.br".to_string()),
        location: "N/A".to_string(),
        ip: Some("200.1.2.3".to_string()),
        user_agent: None,
        duration_seconds: Some(61),
    }
}

fn store() -> (Arc<DuckDbBackend>, Arc<dyn LeadStore>) {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("db"));
    let store: Arc<dyn LeadStore> = db.clone();
    (db, store)
}

#[tokio::test]
async fn test_empty_store_counts_zero() {
    let (_db, store) = store();
    assert_eq!(store.count_visits().await.expect("visits"), 0);
    assert_eq!(store.count_offers().await.expect("offers"), 0);
    assert!(store.recent_offers(RECENT_OFFERS_LIMIT).await.expect("recent").is_empty());
    store.ping().await.expect("ping");
}

#[tokio::test]
async fn test_insert_visit_persists_all_columns() {
    let (db, store) = store();
    store.insert_visit(&sample_visit(42)).await.expect("insert");
    assert_eq!(store.count_visits().await.expect("visits"), 1);

    let conn = db.conn_for_test().await;
    let (domain, location, duration): (String, String, i64) = conn
        .prepare("SELECT domain, location, duration_seconds FROM visits")
        .expect("prepare")
        .query_row([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("row");
    assert_eq!(domain, "example.ia.br");
    assert_eq!(location, "Recife, Pernambuco, Brazil");
    assert_eq!(duration, 42);
}

#[tokio::test]
async fn test_visit_with_missing_fields_is_stored_as_null() {
    let (db, store) = store();
    store
        .insert_visit(&Visit {
            domain: None,
            ip: None,
            user_agent: None,
            location: "Local/Unknown".to_string(),
            duration_seconds: None,
        })
        .await
        .expect("insert");

    let conn = db.conn_for_test().await;
    let nulls: i64 = conn
        .prepare("SELECT COUNT(*) FROM visits WHERE domain IS NULL AND duration_seconds IS NULL")
        .expect("prepare")
        .query_row([], |row| row.get(0))
        .expect("count");
    assert_eq!(nulls, 1);
}

#[tokio::test]
async fn test_offer_visitor_number_is_visit_count_plus_one() {
    let (_db, store) = store();

    let first = store.insert_offer(&sample_offer("Ana")).await.expect("offer");
    assert_eq!(first.visitor_number, 1);

    for d in 0..3 {
        store.insert_visit(&sample_visit(d)).await.expect("visit");
    }
    let second = store.insert_offer(&sample_offer("Bruno")).await.expect("offer");
    assert_eq!(second.visitor_number, 4);
    assert_eq!(second.name.as_deref(), Some("Bruno"));
    assert_eq!(second.duration_seconds, Some(61));
    assert!(!second.created_at.is_empty());
    assert!(second.id > first.id);

    assert_eq!(store.count_offers().await.expect("offers"), 2);
}

#[tokio::test]
async fn test_concurrent_offers_see_consistent_counts() {
    let (_db, store) = store();
    store.insert_visit(&sample_visit(5)).await.expect("visit");

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .insert_offer(&sample_offer(&format!("Lead{i}")))
                .await
                .expect("offer")
        }));
    }
    for handle in handles {
        let offer = handle.await.expect("join");
        assert_eq!(offer.visitor_number, 2);
    }
    assert_eq!(store.count_offers().await.expect("offers"), 8);
}

#[tokio::test]
async fn test_recent_offers_newest_first_and_capped() {
    let (db, store) = store();
    for i in 0..55 {
        store
            .insert_offer(&sample_offer(&format!("Lead{i}")))
            .await
            .expect("offer");
    }

    let recent = store.recent_offers(RECENT_OFFERS_LIMIT).await.expect("recent");
    assert_eq!(recent.len(), 50);
    assert_eq!(recent[0].name.as_deref(), Some("Lead54"));
    assert_eq!(recent[49].name.as_deref(), Some("Lead5"));
    drop(recent);

    // An older timestamp moves a row to the back regardless of insertion order.
    {
        let conn = db.conn_for_test().await;
        conn.execute(
            "UPDATE offers SET created_at = TIMESTAMP '2000-01-01 00:00:00' WHERE name = ?1",
            offerbox_duckdb::duckdb::params!["Lead54"],
        )
        .expect("backdate");
    }
    let recent = store.recent_offers(100).await.expect("recent");
    assert_eq!(recent.len(), 55);
    assert_eq!(recent[0].name.as_deref(), Some("Lead53"));
    assert_eq!(recent[54].name.as_deref(), Some("Lead54"));
}

#[tokio::test]
async fn test_reopening_file_keeps_rows() {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("unix time")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("offerbox-reopen-{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("offerbox.db").to_string_lossy().to_string();

    {
        let db = DuckDbBackend::open(&path, "256MB").expect("open");
        db.insert_visit(&sample_visit(3)).await.expect("visit");
    }
    let db = DuckDbBackend::open(&path, "256MB").expect("reopen");
    assert_eq!(db.count_visits().await.expect("visits"), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_average_visit_seconds_ignores_missing_durations() {
    let (db, store) = store();
    assert_eq!(db.average_visit_seconds().await.expect("avg"), None);

    store.insert_visit(&sample_visit(30)).await.expect("insert");
    store.insert_visit(&sample_visit(90)).await.expect("insert");
    let mut no_duration = sample_visit(0);
    no_duration.duration_seconds = None;
    store.insert_visit(&no_duration).await.expect("insert");

    let avg = db.average_visit_seconds().await.expect("avg").expect("some");
    assert!((avg - 60.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_schema_creates_only_lead_tables() {
    let (db, _store) = store();
    let conn = db.conn_for_test().await;
    let mut stmt = conn
        .prepare("SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name")
        .expect("prepare");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(tables, vec!["offers".to_string(), "visits".to_string()]);
}
