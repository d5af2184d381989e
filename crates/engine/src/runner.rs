// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command execution with full output capture.

use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Exit code reported when a command exceeds its time limit, matching
/// timeout(1).
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when a command dies to a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// The shell itself could not be started. A command that starts and
    /// then fails is not an error; it is a [`RunOutput`] with a non-zero
    /// exit code.
    #[error("failed to spawn `{shell} -c`: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one command run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_secs: f64,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs job commands through a shell, inheriting the daemon's
/// environment and working directory.
#[derive(Debug, Clone)]
pub struct Runner {
    shell: String,
    timeout: Option<Duration>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            timeout: None,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Cap each run at `timeout`. Unset by default: commands run as long
    /// as they need.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `command` to completion and capture everything it wrote.
    pub async fn run(&self, command: &str) -> Result<RunOutput, RunnerError> {
        let started = Instant::now();
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                shell: self.shell.clone(),
                source,
            })?;

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                // Dropping the child on the timeout path kills the process.
                Err(_elapsed) => {
                    return Ok(RunOutput {
                        stdout: String::new(),
                        stderr: format!("command timed out after {}s", limit.as_secs()),
                        exit_code: TIMEOUT_EXIT_CODE,
                        duration_secs: started.elapsed().as_secs_f64(),
                    });
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| RunnerError::Spawn {
            shell: self.shell.clone(),
            source,
        })?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(SIGNALED_EXIT_CODE),
            duration_secs: started.elapsed().as_secs_f64(),
        })
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
