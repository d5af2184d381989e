// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records, status lifecycle, and execution logs.

use crate::id::JobId;
use crate::schedule::Schedule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when parsing a status string that names no known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: '{0}'")]
pub struct InvalidStatus(pub String);

/// Lifecycle status of a job.
///
/// `scheduled → running → {complete | failed}`; `inactive` is reachable
/// from any state by user request and excludes the job from triggering.
/// All transitions go through the scheduler; users may only set the
/// subset reported by [`JobStatus::is_user_settable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Scheduled,
    Running,
    Complete,
    Failed,
    Inactive,
}

impl JobStatus {
    /// Statuses a user may set directly: `scheduled` re-arms a job,
    /// `complete` marks it done for dependents, `inactive` parks it.
    /// `running` and `failed` are owned by the scheduler.
    pub fn is_user_settable(&self) -> bool {
        matches!(
            self,
            JobStatus::Scheduled | JobStatus::Complete | JobStatus::Inactive
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Scheduled => write!(f, "scheduled"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Complete => write!(f, "complete"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(JobStatus::Scheduled),
            "running" => Ok(JobStatus::Running),
            "complete" => Ok(JobStatus::Complete),
            "failed" => Ok(JobStatus::Failed),
            "inactive" => Ok(JobStatus::Inactive),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// One record of a single execution attempt.
///
/// `timestamp` is the end-of-execution time. The duration serializes
/// under the key `execution_time`, the log blob's historical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "execution_time")]
    pub duration_secs: f64,
}

/// A job as the scheduler sees it: strongly typed, deserialized from
/// the store's record form at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    /// Unique across all non-deleted jobs.
    pub name: String,
    pub schedule: Schedule,
    /// Opaque shell command.
    pub command: String,
    /// Ordered dependency job ids; duplicates permitted.
    pub dependencies: Vec<JobId>,
    pub status: JobStatus,
    /// End time of the most recent completed execution attempt.
    pub last_run: Option<DateTime<Utc>>,
    /// Append-only except for explicit delete/purge operations.
    pub logs: Vec<LogEntry>,
}

impl Job {
    /// Number of recorded execution attempts.
    pub fn run_count(&self) -> usize {
        self.logs.len()
    }

    /// Mean execution duration in seconds, `None` without any runs.
    pub fn average_execution_time(&self) -> Option<f64> {
        if self.logs.is_empty() {
            return None;
        }
        let total: f64 = self.logs.iter().map(|entry| entry.duration_secs).sum();
        Some(total / self.logs.len() as f64)
    }
}

/// Fields for creating a job; the store assigns the id and the job
/// starts `scheduled` with no runs.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub schedule: Schedule,
    pub command: String,
    pub dependencies: Vec<JobId>,
}

impl NewJob {
    /// Build the job record the store persists for this request.
    pub fn into_job(self, id: JobId) -> Job {
        Job {
            id,
            name: self.name,
            schedule: self.schedule,
            command: self.command,
            dependencies: self.dependencies,
            status: JobStatus::Scheduled,
            last_run: None,
            logs: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
