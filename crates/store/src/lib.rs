// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rota-store: record storage for jobs.
//!
//! The scheduler sees strongly-typed [`Job`] values; stores persist the
//! serialized record form of [`record::JobRecord`] and convert at the
//! boundary. [`MemoryStore`] backs tests and embedded use,
//! [`FileStore`] backs the daemon.

mod file;
mod memory;
pub mod record;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::JobRecord;

use async_trait::async_trait;
use rota_core::{Job, JobId, NewJob};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given id (or name, for name lookups).
    #[error("job not found: {0}")]
    NotFound(JobId),
    /// No record with the given name.
    #[error("job not found: '{0}'")]
    NameNotFound(String),
    /// Create would violate name uniqueness.
    #[error("job name already exists: '{0}'")]
    DuplicateName(String),
    /// The store cannot currently serve the request (I/O failure,
    /// corrupt record). State is left at its last persisted value.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for both id and name misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::NameNotFound(_))
    }
}

/// Durable record storage for jobs, keyed by id and unique name.
#[async_trait]
pub trait JobStore: Clone + Send + Sync + 'static {
    /// Fetch one job by id.
    async fn get(&self, id: JobId) -> Result<Job, StoreError>;

    /// Fetch one job by its unique name.
    async fn get_by_name(&self, name: &str) -> Result<Job, StoreError>;

    /// All jobs, in id order.
    async fn list(&self) -> Result<Vec<Job>, StoreError>;

    /// All jobs with status other than `inactive`, in id order.
    ///
    /// Used at startup to re-register triggers. A record whose blobs no
    /// longer parse is logged and skipped rather than failing the scan.
    async fn list_active(&self) -> Result<Vec<Job>, StoreError>;

    /// Persist a new job; the store assigns the id.
    async fn create(&self, new: NewJob) -> Result<Job, StoreError>;

    /// Replace the stored record for `job.id`.
    async fn update(&self, job: &Job) -> Result<(), StoreError>;

    /// Remove the record.
    async fn delete(&self, id: JobId) -> Result<(), StoreError>;
}
