// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed job store.
//!
//! The whole record set persists as one JSON document, rewritten
//! atomically (write to `.tmp`, fsync, rename) after every mutation.
//! A document that no longer parses is moved aside to a `.bak` file and
//! the store starts fresh rather than refusing to open.

use crate::record::JobRecord;
use crate::{JobStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rota_core::{Job, JobId, NewJob};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    next_id: i64,
    jobs: Vec<JobRecord>,
}

#[derive(Debug, Default)]
struct FileInner {
    next_id: i64,
    records: HashMap<i64, JobRecord>,
}

/// Store persisting records to a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Arc<PathBuf>,
    inner: Arc<Mutex<FileInner>>,
}

fn io_failed(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

impl FileStore {
    /// Open the store at `path`, loading any existing document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = load_document(&path)?;
        let inner = FileInner {
            next_id: document.next_id,
            records: document
                .jobs
                .into_iter()
                .map(|record| (record.id, record))
                .collect(),
        };
        Ok(Self {
            path: Arc::new(path),
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the document atomically from the current state.
    fn persist(&self, inner: &FileInner) -> Result<(), StoreError> {
        let mut jobs: Vec<JobRecord> = inner.records.values().cloned().collect();
        jobs.sort_by_key(|record| record.id);
        let document = StoreDocument {
            next_id: inner.next_id,
            jobs,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_failed)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path).map_err(io_failed)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &document).map_err(io_failed)?;
            let file = writer.into_inner().map_err(|e| io_failed(e.into_error()))?;
            file.sync_all().map_err(io_failed)?;
        }
        fs::rename(&tmp_path, self.path.as_path()).map_err(io_failed)
    }
}

fn load_document(path: &Path) -> Result<StoreDocument, StoreError> {
    if !path.exists() {
        return Ok(StoreDocument::default());
    }
    let file = File::open(path).map_err(io_failed)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(document) => Ok(document),
        Err(err) => {
            let bak_path = path.with_extension("bak");
            warn!(
                error = %err,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt job file, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path).map_err(io_failed)?;
            Ok(StoreDocument::default())
        }
    }
}

#[async_trait]
impl JobStore for FileStore {
    async fn get(&self, id: JobId) -> Result<Job, StoreError> {
        let inner = self.inner.lock();
        let record = inner
            .records
            .get(&id.value())
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        record.into_job().map_err(io_failed)
    }

    async fn get_by_name(&self, name: &str) -> Result<Job, StoreError> {
        let inner = self.inner.lock();
        let record = inner
            .records
            .values()
            .find(|record| record.name == name)
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound(name.to_string()))?;
        record.into_job().map_err(io_failed)
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock();
        Ok(crate::record::scan_jobs(
            inner.records.values().cloned(),
            false,
        ))
    }

    async fn list_active(&self) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.lock();
        Ok(crate::record::scan_jobs(
            inner.records.values().cloned(),
            true,
        ))
    }

    async fn create(&self, new: NewJob) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock();
        if inner
            .records
            .values()
            .any(|record| record.name == new.name)
        {
            return Err(StoreError::DuplicateName(new.name));
        }
        let id = inner.next_id + 1;
        let job = new.into_job(JobId::new(id));
        let record = JobRecord::from_job(&job).map_err(io_failed)?;
        inner.records.insert(id, record);
        inner.next_id = id;
        self.persist(&inner)?;
        Ok(job)
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if !inner.records.contains_key(&job.id.value()) {
            return Err(StoreError::NotFound(job.id));
        }
        if inner
            .records
            .values()
            .any(|record| record.name == job.name && record.id != job.id.value())
        {
            return Err(StoreError::DuplicateName(job.name.clone()));
        }
        let record = JobRecord::from_job(job).map_err(io_failed)?;
        inner.records.insert(job.id.value(), record);
        self.persist(&inner)
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner
            .records
            .remove(&id.value())
            .ok_or(StoreError::NotFound(id))?;
        self.persist(&inner)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
