/// DuckDB initialization SQL.
///
/// Executed once at open time via `Connection::execute_batch`. Every
/// statement uses `IF NOT EXISTS`, so re-running it on each startup is safe.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `OFFERBOX_DUCKDB_MEMORY`, default `"1GB"`). An explicit limit keeps
/// DuckDB from claiming 80% of system RAM inside a server process.
///
/// Both tables are append-only. Ids come from sequences so rows written in
/// the same microsecond still have a stable newest-first order.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- VISITS (one row per page session, written by the unload beacon)
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS visits_id_seq START 1;
CREATE TABLE IF NOT EXISTS visits (
    id                BIGINT PRIMARY KEY DEFAULT nextval('visits_id_seq'),
    domain            VARCHAR,                     -- deployment URL or Host header
    ip                VARCHAR,
    user_agent        VARCHAR,
    location          VARCHAR NOT NULL,            -- 'city, region, country' or a sentinel
    duration_seconds  BIGINT,
    created_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- OFFERS (lead-capture submissions)
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS offers_id_seq START 1;
CREATE TABLE IF NOT EXISTS offers (
    id                BIGINT PRIMARY KEY DEFAULT nextval('offers_id_seq'),
    name              VARCHAR,
    email             VARCHAR,
    comment           VARCHAR,
    domain            VARCHAR,
    visitor_number    BIGINT NOT NULL,             -- visit count at insert time + 1
    location          VARCHAR NOT NULL,
    ip                VARCHAR,
    user_agent        VARCHAR,
    duration_seconds  BIGINT,
    created_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
-- Reports read the newest offers first.
CREATE INDEX IF NOT EXISTS idx_offers_created_at ON offers(created_at);
"#
    )
}
