// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serialized record shape of a job.
//!
//! Schedule, dependencies, and logs are stored as JSON text columns
//! (the record layer treats them as opaque blobs); status is a plain
//! string; `last_run` an optional RFC 3339 timestamp. Conversion to and
//! from the typed [`Job`] happens only here.

use chrono::{DateTime, Utc};
use rota_core::{InvalidStatus, Job, JobId, JobStatus, LogEntry, Schedule};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A record whose blobs fail to parse back into typed values.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record {id}: bad {column} blob: {source}")]
    Blob {
        id: i64,
        column: &'static str,
        source: serde_json::Error,
    },
    #[error("record {id}: {source}")]
    Status { id: i64, source: InvalidStatus },
}

/// The persisted form of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i64,
    pub name: String,
    /// JSON blob: `{"minute": "*/5", ...}`.
    pub schedule: String,
    pub command: String,
    /// JSON blob: `[1, 2]`.
    pub dependencies: String,
    pub status: String,
    pub last_run: Option<DateTime<Utc>>,
    /// JSON blob: array of log entries.
    pub logs: String,
}

impl JobRecord {
    /// Serialize a typed job into its record form.
    pub fn from_job(job: &Job) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: job.id.value(),
            name: job.name.clone(),
            schedule: serde_json::to_string(&job.schedule)?,
            command: job.command.clone(),
            dependencies: serde_json::to_string(&job.dependencies)?,
            status: job.status.to_string(),
            last_run: job.last_run,
            logs: serde_json::to_string(&job.logs)?,
        })
    }

    /// Parse the record's blobs back into a typed job.
    pub fn into_job(self) -> Result<Job, RecordError> {
        let id = self.id;
        let schedule: Schedule =
            serde_json::from_str(&self.schedule).map_err(|source| RecordError::Blob {
                id,
                column: "schedule",
                source,
            })?;
        let dependencies: Vec<JobId> =
            serde_json::from_str(&self.dependencies).map_err(|source| RecordError::Blob {
                id,
                column: "dependencies",
                source,
            })?;
        let logs: Vec<LogEntry> =
            serde_json::from_str(&self.logs).map_err(|source| RecordError::Blob {
                id,
                column: "logs",
                source,
            })?;
        let status: JobStatus = self
            .status
            .parse()
            .map_err(|source| RecordError::Status { id, source })?;
        Ok(Job {
            id: JobId::new(id),
            name: self.name,
            schedule,
            command: self.command,
            dependencies,
            status,
            last_run: self.last_run,
            logs,
        })
    }
}

/// Parse a batch of records, keeping id order.
///
/// Unreadable records are logged and skipped so one bad row cannot
/// poison a scan; direct fetches still surface the failure.
pub(crate) fn scan_jobs<I>(records: I, active_only: bool) -> Vec<Job>
where
    I: IntoIterator<Item = JobRecord>,
{
    let mut records: Vec<JobRecord> = records.into_iter().collect();
    records.sort_by_key(|record| record.id);
    records
        .into_iter()
        .filter_map(|record| match record.into_job() {
            Ok(job) => Some(job),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable job record");
                None
            }
        })
        .filter(|job| !active_only || job.status != JobStatus::Inactive)
        .collect()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
