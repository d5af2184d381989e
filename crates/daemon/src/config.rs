// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

use rota_engine::SchedulerConfig;
use serde::Deserialize;

use crate::env::state_dir;
use crate::lifecycle::LifecycleError;

/// Default cadence for the trigger tick loop.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/rota)
    pub state_dir: PathBuf,
    /// Path to the job store
    pub store_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Trigger poll cadence
    pub tick_interval: Duration,
    /// Optional cap on each command run
    pub command_timeout: Option<Duration>,
}

/// Optional overrides read from `config.toml` in the state directory.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    tick_interval_secs: Option<u64>,
    command_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under the resolved state directory. One daemon
    /// serves all of a user's jobs.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::from_state_dir(state_dir()?)
    }

    /// Build a configuration rooted at `state_dir`, honoring its
    /// `config.toml` when present.
    pub fn from_state_dir(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let config_path = state_dir.join("config.toml");
        let overrides = match std::fs::read_to_string(&config_path) {
            Ok(text) => {
                toml::from_str(&text).map_err(|source| LifecycleError::InvalidConfig {
                    path: config_path,
                    source,
                })?
            }
            Err(_) => FileOverrides::default(),
        };

        Ok(Self {
            store_path: state_dir.join("jobs.json"),
            lock_path: state_dir.join("rotad.pid"),
            log_path: state_dir.join("rotad.log"),
            tick_interval: overrides
                .tick_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
            // Zero means unlimited, same as leaving the key out.
            command_timeout: overrides
                .command_timeout_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
            state_dir,
        })
    }

    /// The scheduler settings this configuration asks for.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: self.tick_interval,
            command_timeout: self.command_timeout,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
