//! Storage module for persisting crawl data
//!
//! This module holds the visited set and the crawl's records:
//! - The `Datastore` trait consumed by the link manager and the save step
//! - An in-memory backend used by default
//! - A SQLite backend with run tracking

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryDatastore;
pub use sqlite::SqliteDatastore;
pub use traits::{Datastore, StoreError, StoreResult};

use std::path::Path;

/// Opens or creates a SQLite datastore
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteDatastore)` - Successfully initialized storage
/// * `Err(StoreError)` - Failed to open the database or create the schema
pub fn open_datastore(path: &Path) -> StoreResult<SqliteDatastore> {
    SqliteDatastore::new(path)
}

/// A reference found in a response, with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Normalized target URL
    pub url: String,
    /// URL of the response the reference was found in
    pub source_url: String,
    /// Node kind, e.g. `a`, `img`, `css-url`, `location-header`
    pub node: String,
    pub attribute: Option<String>,
    /// HTTP status of the source response, for redirects
    pub status: Option<u16>,
}

/// A processed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    pub size: u64,
    pub elapsed_ms: u64,
    pub fetched_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Row counts of a datastore, for the `--stats` report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub queued: u64,
    pub references: u64,
    pub responses: u64,
    pub runs: u64,
}
