// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger registration and due-time tracking.

use chrono::{DateTime, Utc};
use rota_core::{JobId, Schedule};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Trigger {
    schedule: Schedule,
    next_fire: Option<DateTime<Utc>>,
}

/// Registered schedules with their precomputed next fire times.
///
/// `next_fire` is `None` when the schedule has no occurrence inside the
/// search window (for example a February 30th). Such triggers stay
/// registered but never come due.
#[derive(Debug, Clone, Default)]
pub struct TriggerMap {
    triggers: HashMap<JobId, Trigger>,
}

impl TriggerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` to fire per `schedule`, replacing any prior
    /// registration for the same id.
    pub fn register(&mut self, id: JobId, schedule: Schedule, now: DateTime<Utc>) {
        let next_fire = schedule.next_after(now);
        self.triggers.insert(
            id,
            Trigger {
                schedule,
                next_fire,
            },
        );
    }

    /// Drop the registration for `id`. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: JobId) -> bool {
        self.triggers.remove(&id).is_some()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.triggers.contains_key(&id)
    }

    /// Next fire time for `id`, if registered and one exists.
    pub fn next_fire_time(&self, id: JobId) -> Option<DateTime<Utc>> {
        self.triggers.get(&id).and_then(|trigger| trigger.next_fire)
    }

    /// Ids whose fire time has arrived, each advanced to its next
    /// occurrence after `now` so a single due moment reports once.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<JobId> {
        let mut fired = Vec::new();
        for (id, trigger) in &mut self.triggers {
            let Some(at) = trigger.next_fire else {
                continue;
            };
            if at <= now {
                trigger.next_fire = trigger.schedule.next_after(now);
                fired.push(*id);
            }
        }
        fired.sort_unstable();
        fired
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
