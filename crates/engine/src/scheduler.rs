// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle control.
//!
//! One [`Scheduler`] instance owns the trigger map, the per-job run
//! guard, and the background tick loop. Callers construct it with a
//! store and a clock; nothing here is process-global.

use crate::gate::{self, GateDecision};
use crate::runner::{RunOutput, Runner};
use crate::trigger::TriggerMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rota_core::{Clock, Job, JobId, JobStatus, LogEntry, NewJob};
use rota_store::{JobStore, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Report code for any run that was refused or failed.
pub const RUN_REFUSED: i32 = 8;

/// Log entries kept per job after a purge.
pub const KEPT_LOGS: usize = 10;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("status {0} cannot be set directly")]
    NotUserSettable(JobStatus),
    #[error("job {id} has no log entry at index {index}")]
    LogIndexOutOfRange { id: JobId, index: usize },
}

/// Outcome of a run request, in the shape callers report to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub code: i32,
    pub message: String,
}

impl RunReport {
    fn executed() -> Self {
        Self {
            code: 0,
            message: "Job executed".to_string(),
        }
    }

    fn refused(message: impl Into<String>) -> Self {
        Self {
            code: RUN_REFUSED,
            message: message.into(),
        }
    }
}

/// A job together with its next trigger fire time.
#[derive(Debug, Clone)]
pub struct JobListing {
    pub job: Job,
    pub next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the tick loop polls for due triggers.
    pub tick_interval: Duration,
    /// Optional cap on each command run.
    pub command_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            command_timeout: None,
        }
    }
}

/// The scheduling engine.
///
/// Clones share all state, so the daemon can hand copies to background
/// tasks and signal handlers.
#[derive(Debug)]
pub struct Scheduler<S: JobStore, C: Clock> {
    store: S,
    clock: C,
    runner: Runner,
    triggers: Arc<Mutex<TriggerMap>>,
    running: Arc<Mutex<HashSet<JobId>>>,
    shutdown: Arc<Notify>,
    tick_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl<S: JobStore, C: Clock> Clone for Scheduler<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            runner: self.runner.clone(),
            triggers: Arc::clone(&self.triggers),
            running: Arc::clone(&self.running),
            shutdown: Arc::clone(&self.shutdown),
            tick_task: Arc::clone(&self.tick_task),
            tick_interval: self.tick_interval,
        }
    }
}

/// Marks a job as running for the guard's lifetime.
struct RunGuard {
    running: Arc<Mutex<HashSet<JobId>>>,
    id: JobId,
}

impl RunGuard {
    fn acquire(running: &Arc<Mutex<HashSet<JobId>>>, id: JobId) -> Option<Self> {
        if running.lock().insert(id) {
            Some(Self {
                running: Arc::clone(running),
                id,
            })
        } else {
            None
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.lock().remove(&self.id);
    }
}

impl<S: JobStore, C: Clock> Scheduler<S, C> {
    pub fn new(store: S, clock: C, config: SchedulerConfig) -> Self {
        let mut runner = Runner::new();
        if let Some(timeout) = config.command_timeout {
            runner = runner.with_timeout(timeout);
        }
        Self {
            store,
            clock,
            runner,
            triggers: Arc::new(Mutex::new(TriggerMap::new())),
            running: Arc::new(Mutex::new(HashSet::new())),
            shutdown: Arc::new(Notify::new()),
            tick_task: Arc::new(Mutex::new(None)),
            tick_interval: config.tick_interval,
        }
    }

    /// Register triggers for every active job and start the tick loop.
    ///
    /// Calling `start` again re-registers without spawning a second
    /// loop, so a registration exists exactly once per active job.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let jobs = self.store.list_active().await?;
        let now = self.clock.now_utc();
        {
            let mut triggers = self.triggers.lock();
            for job in &jobs {
                triggers.register(job.id, job.schedule.clone(), now);
            }
        }
        info!(jobs = jobs.len(), "scheduler started");

        let mut tick_task = self.tick_task.lock();
        if tick_task.is_none() {
            *tick_task = Some(tokio::spawn(self.clone().tick_loop()));
        }
        Ok(())
    }

    /// Stop the tick loop and wait for it to exit. In-flight runs are
    /// left to finish on their own tasks.
    pub async fn stop(&self) {
        self.shutdown.notify_one();
        let handle = self.tick_task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                debug!(error = %err, "tick loop ended abnormally");
            }
        }
        info!("scheduler stopped");
    }

    async fn tick_loop(self) {
        // NOTE: the interval lives outside the select loop so the
        // cadence holds instead of restarting every iteration.
        let mut tick = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tick.tick() => {
                    let now = self.clock.now_utc();
                    let due = self.triggers.lock().due(now);
                    for id in due {
                        let scheduler = self.clone();
                        tokio::spawn(async move { scheduler.fire(id).await });
                    }
                }
            }
        }
    }

    /// Handle one trigger firing.
    async fn fire(&self, id: JobId) {
        let job = match self.store.get(id).await {
            Ok(job) => job,
            Err(err) if err.is_not_found() => {
                debug!(%id, "trigger fired for a deleted job");
                self.triggers.lock().unregister(id);
                return;
            }
            Err(err) => {
                error!(%id, error = %err, "could not load job for its trigger");
                return;
            }
        };
        match job.status {
            JobStatus::Scheduled | JobStatus::Failed => {
                let report = self.execute_pipeline(job).await;
                debug!(%id, code = report.code, message = %report.message, "trigger run finished");
            }
            JobStatus::Running => debug!(%id, "trigger skipped: run already in flight"),
            JobStatus::Complete => {
                debug!(%id, "trigger skipped: complete until a dependent re-arms it");
            }
            JobStatus::Inactive => debug!(%id, "trigger skipped: job is inactive"),
        }
    }

    /// Gate, mark running, execute, and record the result.
    ///
    /// Shared by the trigger path and `run_job_now`; the per-job guard
    /// keeps the two from overlapping.
    async fn execute_pipeline(&self, mut job: Job) -> RunReport {
        let id = job.id;
        let Some(_guard) = RunGuard::acquire(&self.running, id) else {
            return RunReport::refused("Job is already running");
        };

        match gate::check(&job, &self.store).await {
            Ok(GateDecision::Proceed) => {}
            Ok(GateDecision::Defer { incomplete }) => {
                debug!(%id, blocked_on = ?incomplete, "run deferred: dependencies not complete");
                return RunReport::refused("Dependencies not complete");
            }
            Err(err) => {
                error!(%id, error = %err, "dependency check failed");
                return RunReport::refused("Store unavailable");
            }
        }

        job.status = JobStatus::Running;
        if let Err(err) = self.store.update(&job).await {
            if err.is_not_found() {
                debug!(%id, "job deleted before its run could start");
                return RunReport::refused("Job not found");
            }
            error!(%id, error = %err, "could not mark job running");
            return RunReport::refused("Store unavailable");
        }

        match self.runner.run(&job.command).await {
            Ok(output) => {
                let completed = output.success();
                self.record_outcome(id, output).await;
                if completed {
                    self.reset_complete_dependencies(&job).await;
                    RunReport::executed()
                } else {
                    RunReport::refused("Job failed")
                }
            }
            Err(err) => {
                warn!(%id, error = %err, "command could not be spawned");
                self.force_failed(id).await;
                RunReport::refused("Job failed")
            }
        }
    }

    /// Append the log entry and settle the final status.
    async fn record_outcome(&self, id: JobId, output: RunOutput) {
        // Re-fetch: the job may have changed or vanished while running.
        let mut job = match self.store.get(id).await {
            Ok(job) => job,
            Err(err) if err.is_not_found() => {
                debug!(%id, "job deleted mid-run; dropping its result");
                return;
            }
            Err(err) => {
                error!(%id, error = %err, "could not reload job to record its run");
                return;
            }
        };

        let RunOutput {
            stdout,
            stderr,
            exit_code,
            duration_secs,
        } = output;
        let finished = self.clock.now_utc();
        job.logs.push(LogEntry {
            timestamp: finished,
            stdout,
            stderr,
            duration_secs,
        });
        job.last_run = Some(finished);
        job.status = if exit_code == 0 {
            JobStatus::Complete
        } else {
            JobStatus::Failed
        };

        match self.store.update(&job).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(%id, "job deleted mid-run; dropping its result");
            }
            Err(err) => error!(%id, error = %err, "could not persist run result"),
        }
    }

    /// On completion, dependencies that are complete go back to
    /// scheduled so the chain can fire again on its next trigger.
    async fn reset_complete_dependencies(&self, job: &Job) {
        for dep_id in &job.dependencies {
            match self.store.get(*dep_id).await {
                Ok(mut dep) if dep.status == JobStatus::Complete => {
                    dep.status = JobStatus::Scheduled;
                    if let Err(err) = self.store.update(&dep).await {
                        warn!(id = %dep_id, error = %err, "could not re-arm dependency");
                    }
                }
                Ok(_) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    warn!(id = %dep_id, error = %err, "could not load dependency to re-arm");
                }
            }
        }
    }

    /// Best-effort failed marker for runs that never started.
    async fn force_failed(&self, id: JobId) {
        let mut job = match self.store.get(id).await {
            Ok(job) => job,
            Err(_) => return,
        };
        job.status = JobStatus::Failed;
        if let Err(err) = self.store.update(&job).await {
            if !err.is_not_found() {
                error!(%id, error = %err, "could not mark job failed");
            }
        }
    }

    /// Create a job and arm its trigger.
    pub async fn create_job(&self, new: NewJob) -> Result<Job, SchedulerError> {
        let job = self.store.create(new).await?;
        self.triggers
            .lock()
            .register(job.id, job.schedule.clone(), self.clock.now_utc());
        info!(id = %job.id, name = %job.name, "job created");
        Ok(job)
    }

    /// Persist `job` and bring its trigger in line with the new
    /// schedule and status.
    pub async fn update_job(&self, job: &Job) -> Result<(), SchedulerError> {
        self.store.update(job).await?;
        let mut triggers = self.triggers.lock();
        if job.status == JobStatus::Inactive {
            triggers.unregister(job.id);
        } else {
            triggers.register(job.id, job.schedule.clone(), self.clock.now_utc());
        }
        Ok(())
    }

    /// Delete a job and drop its trigger. A run already in flight
    /// finishes, but its result is discarded when it tries to persist.
    pub async fn delete_job(&self, id: JobId) -> Result<(), SchedulerError> {
        self.store.delete(id).await?;
        self.triggers.lock().unregister(id);
        info!(%id, "job deleted");
        Ok(())
    }

    /// Run a job immediately, bypassing its trigger but not its gate.
    pub async fn run_job_now(&self, id: JobId) -> Result<RunReport, SchedulerError> {
        let job = match self.store.get(id).await {
            Ok(job) => job,
            Err(err) if err.is_not_found() => {
                return Ok(RunReport::refused("Job not found"));
            }
            Err(err) => return Err(err.into()),
        };
        if job.status == JobStatus::Inactive {
            return Ok(RunReport::refused("Job is inactive"));
        }
        Ok(self.execute_pipeline(job).await)
    }

    /// Set a status on a user's behalf. Only `scheduled`, `complete`,
    /// and `inactive` may be set this way.
    pub async fn set_job_status(&self, id: JobId, status: JobStatus) -> Result<(), SchedulerError> {
        if !status.is_user_settable() {
            return Err(SchedulerError::NotUserSettable(status));
        }
        let mut job = self.store.get(id).await?;
        job.status = status;
        self.store.update(&job).await?;

        let mut triggers = self.triggers.lock();
        match status {
            JobStatus::Inactive => {
                triggers.unregister(id);
            }
            JobStatus::Scheduled => {
                triggers.register(id, job.schedule.clone(), self.clock.now_utc());
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job, SchedulerError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn get_job_by_name(&self, name: &str) -> Result<Job, SchedulerError> {
        Ok(self.store.get_by_name(name).await?)
    }

    /// Every job with its next fire time, in id order.
    pub async fn list_jobs(&self) -> Result<Vec<JobListing>, SchedulerError> {
        let jobs = self.store.list().await?;
        let triggers = self.triggers.lock();
        Ok(jobs
            .into_iter()
            .map(|job| {
                let next_run = triggers.next_fire_time(job.id);
                JobListing { job, next_run }
            })
            .collect())
    }

    pub async fn job_status(&self, id: JobId) -> Result<JobStatus, SchedulerError> {
        Ok(self.store.get(id).await?.status)
    }

    /// Next fire time for a registered trigger.
    pub fn next_run_time(&self, id: JobId) -> Option<DateTime<Utc>> {
        self.triggers.lock().next_fire_time(id)
    }

    /// Remove one log entry by position.
    pub async fn delete_log(&self, id: JobId, index: usize) -> Result<(), SchedulerError> {
        let mut job = self.store.get(id).await?;
        if index >= job.logs.len() {
            return Err(SchedulerError::LogIndexOutOfRange { id, index });
        }
        job.logs.remove(index);
        self.store.update(&job).await?;
        Ok(())
    }

    /// Trim a job's history to the newest [`KEPT_LOGS`] entries,
    /// returning how many were dropped.
    pub async fn purge_logs(&self, id: JobId) -> Result<usize, SchedulerError> {
        let mut job = self.store.get(id).await?;
        let excess = job.logs.len().saturating_sub(KEPT_LOGS);
        if excess > 0 {
            job.logs.drain(..excess);
            self.store.update(&job).await?;
        }
        Ok(excess)
    }

    /// Drop a job's entire run history, returning how many entries
    /// were removed.
    pub async fn clear_logs(&self, id: JobId) -> Result<usize, SchedulerError> {
        let mut job = self.store.get(id).await?;
        let removed = job.logs.len();
        if removed > 0 {
            job.logs.clear();
            self.store.update(&job).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
