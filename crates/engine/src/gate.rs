// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency gate: decides whether a due job may run.

use rota_core::{Job, JobStatus};
use rota_store::{JobStore, StoreError};

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Every dependency is complete (or there are none).
    Proceed,
    /// At least one dependency has not completed. `incomplete` holds the
    /// blockers in dependency order, by name, or as `#<id>` when the
    /// referenced job no longer exists.
    Defer { incomplete: Vec<String> },
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

/// Check `job`'s dependencies against the store.
///
/// A dependency that cannot be found is treated as incomplete, not as an
/// error. Store outages do surface as errors so callers can tell a
/// blocked run from a broken store.
pub async fn check<S: JobStore>(job: &Job, store: &S) -> Result<GateDecision, StoreError> {
    let mut incomplete = Vec::new();
    for dep_id in &job.dependencies {
        match store.get(*dep_id).await {
            Ok(dep) => {
                if dep.status != JobStatus::Complete {
                    incomplete.push(dep.name);
                }
            }
            Err(err) if err.is_not_found() => incomplete.push(format!("#{dep_id}")),
            Err(err) => return Err(err),
        }
    }
    if incomplete.is_empty() {
        Ok(GateDecision::Proceed)
    } else {
        Ok(GateDecision::Defer { incomplete })
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
