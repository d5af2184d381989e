// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a job record.
///
/// Ids are assigned by the store at creation time (a monotone counter,
/// matching an autoincrement primary key) and never reused within a
/// store's lifetime.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Create an id from its raw integer value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
