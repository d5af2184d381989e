// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process lifecycle: lock acquisition, store wiring, shutdown.

use std::fs::File;
use std::path::PathBuf;

use fs2::FileExt;
use rota_core::SystemClock;
use rota_engine::{Scheduler, SchedulerError};
use rota_store::{FileStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Running daemon state.
#[derive(Debug)]
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive daemon lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// The scheduling engine, already started
    pub scheduler: Scheduler<FileStore, SystemClock>,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Invalid config at {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock: those
            // files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory (needed for lock, store, log)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Open without truncating so a failed attempt cannot wipe the
    // running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Open the store and start the engine
    let store = FileStore::open(&config.store_path)?;
    let scheduler = Scheduler::new(store, SystemClock, config.scheduler_config());
    scheduler.start().await?;

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        scheduler,
    })
}

impl DaemonState {
    /// Stop the engine and release the lock file.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        self.scheduler.stop().await;

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove lock file: {}", e);
            }
        }
        // Lock itself is released when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Remove startup leftovers after a failed start.
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
