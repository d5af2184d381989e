// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rota-core: domain types for the rota job-scheduling daemon

pub mod clock;
pub mod id;
pub mod job;
pub mod schedule;

pub use clock::{Clock, SystemClock};
pub use id::JobId;
pub use job::{InvalidStatus, Job, JobStatus, LogEntry, NewJob};
pub use schedule::{CronField, Schedule, ScheduleError};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
