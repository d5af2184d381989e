// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job store.

use crate::record::JobRecord;
use crate::{JobStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rota_core::{Job, JobId, NewJob};
use std::collections::HashMap;
use std::sync::Arc;

/// Store keeping records in a process-local map.
///
/// Backs tests and embedded callers; semantics match [`FileStore`]
/// minus durability. Ids count up from 1 and are never reused.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    records: HashMap<i64, JobRecord>,
    unavailable: bool,
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl MemoryInner {
    fn available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn name_taken(&self, name: &str, excluding: Option<i64>) -> bool {
        self.records
            .values()
            .any(|record| record.name == name && Some(record.id) != excluding)
    }

    fn scan(&self, active_only: bool) -> Vec<Job> {
        crate::record::scan_jobs(self.records.values().cloned(), active_only)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Make every subsequent operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Plant a raw record, bypassing validation.
    pub fn insert_record(&self, record: JobRecord) {
        let mut inner = self.inner.lock();
        inner.next_id = inner.next_id.max(record.id);
        inner.records.insert(record.id, record);
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn get(&self, id: JobId) -> Result<Job, StoreError> {
        let inner = self.inner.lock();
        inner.available()?;
        let record = inner
            .records
            .get(&id.value())
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        record.into_job().map_err(corrupt)
    }

    async fn get_by_name(&self, name: &str) -> Result<Job, StoreError> {
        let inner = self.inner.lock();
        inner.available()?;
        let record = inner
            .records
            .values()
            .find(|record| record.name == name)
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound(name.to_string()))?;
        record.into_job().map_err(corrupt)
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock();
        inner.available()?;
        Ok(inner.scan(false))
    }

    async fn list_active(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock();
        inner.available()?;
        Ok(inner.scan(true))
    }

    async fn create(&self, new: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        inner.available()?;
        if inner.name_taken(&new.name, None) {
            return Err(StoreError::DuplicateName(new.name));
        }
        let id = inner.next_id + 1;
        let job = new.into_job(JobId::new(id));
        let record = JobRecord::from_job(&job).map_err(corrupt)?;
        inner.records.insert(id, record);
        inner.next_id = id;
        Ok(job)
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.available()?;
        if !inner.records.contains_key(&job.id.value()) {
            return Err(StoreError::NotFound(job.id));
        }
        // Renames keep the name-uniqueness invariant.
        if inner.name_taken(&job.name, Some(job.id.value())) {
            return Err(StoreError::DuplicateName(job.name.clone()));
        }
        let record = JobRecord::from_job(job).map_err(corrupt)?;
        inner.records.insert(job.id.value(), record);
        Ok(())
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.available()?;
        inner
            .records
            .remove(&id.value())
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
