//! In-memory datastore
//!
//! Used when no database path is configured, and in tests.

use crate::storage::traits::{Datastore, StoreError, StoreResult};
use crate::storage::{ReferenceRecord, ResponseRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryInner {
    queued: HashSet<String>,
    references: Vec<ReferenceRecord>,
    responses: Vec<ResponseRecord>,
}

/// Datastore that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    inner: Mutex<MemoryInner>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryInner>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Number of URLs marked queued
    pub fn queued_count(&self) -> usize {
        self.lock().map(|inner| inner.queued.len()).unwrap_or(0)
    }

    /// Snapshot of the recorded references
    pub fn references(&self) -> Vec<ReferenceRecord> {
        self.lock()
            .map(|inner| inner.references.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the recorded responses
    pub fn responses(&self) -> Vec<ResponseRecord> {
        self.lock()
            .map(|inner| inner.responses.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn is_queued(&self, url: &str) -> StoreResult<bool> {
        Ok(self.lock()?.queued.contains(url))
    }

    async fn set_queued(&self, url: &str) -> StoreResult<()> {
        self.lock()?.queued.insert(url.to_string());
        Ok(())
    }

    async fn add_reference(&self, reference: &ReferenceRecord) -> StoreResult<()> {
        self.lock()?.references.push(reference.clone());
        Ok(())
    }

    async fn add_response(&self, response: &ResponseRecord) -> StoreResult<()> {
        self.lock()?.responses.push(response.clone());
        Ok(())
    }
}
