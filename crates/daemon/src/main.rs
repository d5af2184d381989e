// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rota daemon (rotad)
//!
//! Background process that owns the job store and the scheduling
//! engine. Triggers fire on a one-second tick; each due job is gated
//! on its dependencies and then run through the shell.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod lifecycle;

use std::path::{Path, PathBuf};

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::Config;
use crate::lifecycle::LifecycleError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("rotad {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("rotad {}", env!("CARGO_PKG_VERSION"));
                println!("rota scheduling daemon - runs cron-scheduled jobs with dependency gating");
                println!();
                println!("USAGE:");
                println!("    rotad");
                println!();
                println!("State lives under $ROTA_STATE_DIR, else $XDG_STATE_HOME/rota,");
                println!("else ~/.local/state/rota. Jobs persist in jobs.json there and");
                println!("daemon logs go to rotad.log.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: rotad [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    // Load configuration (user-level daemon)
    let config = Config::load()?;

    // Rotate an oversized log before appending anything to it
    rotate_log_if_needed(&config.log_path);

    // Write startup marker to log (before tracing setup, so callers can find it)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting rotad");

    let state = match lifecycle::startup(&config).await {
        Ok(state) => state,
        Err(LifecycleError::LockFailed(_)) => {
            // Another daemon is already running; print a human-readable
            // message instead of a raw debug error.
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("rotad is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(store = %config.store_path.display(), "Daemon ready");

    // Signal ready for parent process (e.g. systemd, a wrapper script)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    state.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}

/// Logs larger than this are rotated at startup.
pub const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Rotations kept beside the live log (`.1` newest, `.3` oldest).
const MAX_LOG_ROTATIONS: u32 = 3;

fn rotation_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Rotate the log file when it has outgrown [`MAX_LOG_SIZE`], shifting
/// older rotations up and dropping the oldest.
fn rotate_log_if_needed(path: &Path) {
    let Ok(meta) = std::fs::metadata(path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }
    for n in (1..MAX_LOG_ROTATIONS).rev() {
        let from = rotation_path(path, n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotation_path(path, n + 1));
        }
    }
    let _ = std::fs::rename(path, rotation_path(path, 1));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- rotad: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- rotad: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This keeps the error visible even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
