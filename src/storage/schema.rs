//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Site-Scanner database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Visited set, one per run
CREATE TABLE IF NOT EXISTS queued (
    run_id INTEGER NOT NULL DEFAULT 0,
    url TEXT NOT NULL,
    queued_at TEXT NOT NULL,
    PRIMARY KEY (run_id, url)
);

-- Every reference found, with its provenance
CREATE TABLE IF NOT EXISTS refs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    source_url TEXT NOT NULL,
    node TEXT NOT NULL,
    attribute TEXT,
    status INTEGER
);

CREATE INDEX IF NOT EXISTS idx_refs_url ON refs(url);
CREATE INDEX IF NOT EXISTS idx_refs_source ON refs(source_url);

-- Processed responses
CREATE TABLE IF NOT EXISTS responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    charset TEXT,
    size INTEGER NOT NULL,
    elapsed_ms INTEGER NOT NULL,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_url ON responses(url);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
