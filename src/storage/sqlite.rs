//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Datastore trait,
//! plus run tracking used by the CLI.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Datastore, StoreError, StoreResult};
use crate::storage::{ReferenceRecord, ResponseRecord, RunRecord, RunStatus, StoreCounts};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// SQLite datastore backend
///
/// The visited set is scoped to the current run: `create_run` starts a
/// fresh one, so the same database file can be crawled again. Before any
/// run is created, run id 0 is used.
pub struct SqliteDatastore {
    conn: Mutex<Connection>,
    run_id: AtomicI64,
}

impl SqliteDatastore {
    /// Opens or creates the database file and its schema
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            run_id: AtomicI64::new(0),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            run_id: AtomicI64::new(0),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    ///
    /// Visited-set reads and writes that follow belong to this run.
    pub fn create_run(&self, config_hash: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        let run_id = conn.last_insert_rowid();
        self.run_id.store(run_id, Ordering::SeqCst);
        Ok(run_id)
    }

    /// Run whose visited set is in use
    pub fn run_id(&self) -> i64 {
        self.run_id.load(Ordering::SeqCst)
    }

    /// Marks a run finished with the given status
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn()?.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }

    // ===== Statistics =====

    /// Counts rows in every table
    pub fn counts(&self) -> StoreResult<StoreCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> StoreResult<u64> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as u64)
        };

        Ok(StoreCounts {
            queued: count("queued")?,
            references: count("refs")?,
            responses: count("responses")?,
            runs: count("runs")?,
        })
    }

    /// Counts responses grouped by HTTP status, ascending
    pub fn status_breakdown(&self) -> StoreResult<Vec<(u16, u64)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM responses GROUP BY status ORDER BY status")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl Datastore for SqliteDatastore {
    async fn is_queued(&self, url: &str) -> StoreResult<bool> {
        let found = self
            .conn()?
            .query_row(
                "SELECT 1 FROM queued WHERE run_id = ?1 AND url = ?2",
                params![self.run_id(), url],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    async fn set_queued(&self, url: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT OR IGNORE INTO queued (run_id, url, queued_at) VALUES (?1, ?2, ?3)",
            params![self.run_id(), url, now],
        )?;
        Ok(())
    }

    async fn add_reference(&self, reference: &ReferenceRecord) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO refs (url, source_url, node, attribute, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reference.url,
                reference.source_url,
                reference.node,
                reference.attribute,
                reference.status
            ],
        )?;
        Ok(())
    }

    async fn add_response(&self, response: &ResponseRecord) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO responses (url, status, content_type, charset, size, elapsed_ms, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                response.url,
                response.status,
                response.content_type,
                response.charset,
                response.size as i64,
                response.elapsed_ms as i64,
                response.fetched_at
            ],
        )?;
        Ok(())
    }
}
