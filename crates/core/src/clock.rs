// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so fire-time computation is deterministic in tests.

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current wall-clock time.
///
/// Trigger matching is calendar arithmetic, so the clock deals in
/// `DateTime<Utc>` rather than monotonic instants.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for tests.
///
/// Clones share the same underlying time, so a clock handed to a
/// scheduler can be advanced from the test body.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: std::sync::Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

/// Default start for [`FakeClock::new`]: 2026-01-01T00:00:00Z.
#[cfg(any(test, feature = "test-support"))]
const FAKE_CLOCK_START_SECS: i64 = 1_767_225_600;

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    /// Create a clock starting at a fixed, known instant.
    pub fn new() -> Self {
        let start =
            DateTime::from_timestamp(FAKE_CLOCK_START_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH);
        Self::at(start)
    }

    /// Create a clock starting at the given instant.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: std::time::Duration) {
        let delta = TimeDelta::from_std(duration).unwrap_or_default();
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
