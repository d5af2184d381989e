// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rota-engine: the scheduling engine.
//!
//! [`Scheduler`] owns the job lifecycle. A background tick loop asks the
//! [`trigger::TriggerMap`] which jobs are due, the [`gate`] decides whether
//! a due job may run, and the [`runner::Runner`] executes its command.
//! Results land back in the store as log entries and status changes.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod gate;
pub mod runner;
pub mod scheduler;
pub mod trigger;

pub use gate::GateDecision;
pub use runner::{RunOutput, Runner, RunnerError};
pub use scheduler::{
    JobListing, RunReport, Scheduler, SchedulerConfig, SchedulerError, KEPT_LOGS, RUN_REFUSED,
};
pub use trigger::TriggerMap;
