use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use offerbox_core::lead::{NewOffer, Offer, Visit};

use crate::schema::init_sql;

const OFFER_COLUMNS: &str = "id, name, email, comment, domain, visitor_number, location, ip, \
     user_agent, duration_seconds, CAST(created_at AS VARCHAR)";

/// Embedded DuckDB storage for visits and offers.
///
/// DuckDB is single-writer, so the connection sits behind
/// `Arc<tokio::sync::Mutex<_>>`. Holding that lock for the whole
/// count-then-insert in [`DuckDbBackend::insert_offer`] is what keeps
/// visitor numbering consistent inside one process.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path` and apply the schema.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn, memory_limit)?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** database. Data is discarded on drop; meant for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn, "1GB")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection, memory_limit: &str) -> Result<()> {
        conn.execute_batch(&init_sql(memory_limit))?;
        Ok(())
    }

    /// Append one visit row.
    pub async fn insert_visit(&self, visit: &Visit) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO visits (domain, ip, user_agent, location, duration_seconds, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            duckdb::params![
                visit.domain,
                visit.ip,
                visit.user_agent,
                visit.location,
                visit.duration_seconds,
                now_timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Number the offer against the current visit count and store it.
    ///
    /// The count and the insert share one transaction under the connection
    /// lock, so no visit can land between them.
    pub async fn insert_offer(&self, offer: &NewOffer) -> Result<Offer> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let visits: i64 = tx
            .prepare("SELECT COUNT(*) FROM visits")?
            .query_row([], |row| row.get(0))?;
        let visitor_number = visits + 1;

        let stored = {
            let mut stmt = tx.prepare(&format!(
                r#"INSERT INTO offers (
                    name, email, comment, domain, visitor_number,
                    location, ip, user_agent, duration_seconds, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                RETURNING {OFFER_COLUMNS}"#
            ))?;
            stmt.query_row(
                duckdb::params![
                    offer.name,
                    offer.email,
                    offer.comment,
                    offer.domain,
                    visitor_number,
                    offer.location,
                    offer.ip,
                    offer.user_agent,
                    offer.duration_seconds,
                    now_timestamp(),
                ],
                offer_from_row,
            )?
        };

        tx.commit()?;
        info!(
            offer_id = stored.id,
            visitor_number = stored.visitor_number,
            "Offer stored"
        );
        Ok(stored)
    }

    pub async fn count_visits(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM visits")?
            .query_row([], |row| row.get(0))?;
        Ok(count)
    }

    pub async fn count_offers(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare("SELECT COUNT(*) FROM offers")?
            .query_row([], |row| row.get(0))?;
        Ok(count)
    }

    /// Newest offers first; `id` breaks ties between equal timestamps.
    pub async fn recent_offers(&self, limit: usize) -> Result<Vec<Offer>> {
        let conn = self.conn.lock().await;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(duckdb::params![limit], offer_from_row)?;
        let mut offers = Vec::new();
        for row in rows {
            offers.push(row?);
        }
        Ok(offers)
    }

    /// Mean recorded visit duration in seconds. `None` when no visit has one.
    pub async fn average_visit_seconds(&self) -> Result<Option<f64>> {
        let conn = self.conn.lock().await;
        let avg: Option<f64> = conn
            .prepare("SELECT AVG(duration_seconds) FROM visits")?
            .query_row([], |row| row.get(0))?;
        Ok(avg)
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to verify or seed stored data.
    /// Production code should use the typed methods above.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

fn offer_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Offer> {
    Ok(Offer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        comment: row.get(3)?,
        domain: row.get(4)?,
        visitor_number: row.get(5)?,
        location: row.get(6)?,
        ip: row.get(7)?,
        user_agent: row.get(8)?,
        duration_seconds: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// UTC wall clock in a format DuckDB casts to `TIMESTAMP` without a zone shift.
fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}
