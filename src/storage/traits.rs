//! Storage traits and error types
//!
//! This module defines the trait interface for datastore backends and
//! associated error types.

use crate::storage::{ReferenceRecord, ResponseRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// The SQLite error is held behind an `Arc` so the whole enum stays `Clone`.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(Arc<rusqlite::Error>),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Sqlite(Arc::new(error))
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for datastore backends
///
/// The link manager serializes `is_queued`/`set_queued` pairs itself, so an
/// implementation only has to make each call individually consistent.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Returns true if the URL was already marked queued
    async fn is_queued(&self, url: &str) -> StoreResult<bool>;

    /// Marks the URL as queued
    async fn set_queued(&self, url: &str) -> StoreResult<()>;

    /// Records a reference found in a response
    async fn add_reference(&self, reference: &ReferenceRecord) -> StoreResult<()>;

    /// Records a processed response
    async fn add_response(&self, response: &ResponseRecord) -> StoreResult<()>;
}
