//! Daemon startup and shutdown specs
//!
//! Black-box checks of lock handling, the startup marker, corrupt
//! store recovery, and graceful SIGTERM shutdown.

use crate::prelude::*;

#[test]
fn rotad_starts_and_stops_cleanly() {
    let mut daemon = Daemon::unstarted();
    daemon.start();

    let pid = std::fs::read_to_string(daemon.pid_file()).unwrap();
    assert!(!pid.trim().is_empty(), "pid file should hold a pid");

    let code = daemon.stop();
    assert_eq!(code, 0, "SIGTERM should exit cleanly; log:\n{}", daemon.log());
    assert!(
        !daemon.pid_file().exists(),
        "pid file should be removed on shutdown"
    );
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || daemon.log().contains("Daemon stopped")),
        "log should record the shutdown; log:\n{}",
        daemon.log()
    );
}

#[test]
fn the_startup_marker_opens_the_log() {
    let mut daemon = Daemon::unstarted();
    daemon.start();

    let log = daemon.log();
    assert!(
        log.starts_with("--- rotad: starting (pid: "),
        "log should open with the startup marker, got:\n{log}"
    );
    daemon.stop();
}

#[test]
fn a_second_instance_is_refused_with_the_holder_pid() {
    let mut daemon = Daemon::unstarted();
    daemon.start();
    let holder_pid = std::fs::read_to_string(daemon.pid_file())
        .unwrap()
        .trim()
        .to_string();

    let output = daemon.command().output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("rotad is already running"),
        "expected refusal message, got: {stderr}"
    );
    assert!(
        stderr.contains(&holder_pid),
        "expected holder pid {holder_pid}, got: {stderr}"
    );

    daemon.stop();
}

#[test]
fn a_stale_pid_file_does_not_block_startup() {
    let mut daemon = Daemon::unstarted();
    // Leftover pid file from a dead daemon: nothing holds the lock.
    daemon.file("rotad.pid", "999999\n");

    daemon.start();
    let pid = std::fs::read_to_string(daemon.pid_file()).unwrap();
    assert_ne!(pid.trim(), "999999", "pid file should be rewritten");
    daemon.stop();
}

#[test]
fn a_corrupt_store_is_set_aside_at_startup() {
    let mut daemon = Daemon::unstarted();
    daemon.file("jobs.json", "{ definitely not json");

    daemon.start();
    assert!(
        daemon.store_file().with_extension("bak").exists(),
        "corrupt store should be moved to .bak; log:\n{}",
        daemon.log()
    );
    assert_eq!(daemon.stop(), 0);
}
