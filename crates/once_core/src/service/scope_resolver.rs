//! Scope resolution for done-queries.
//!
//! # Responsibility
//! - Decide whether one stored timestamp falls inside a requested scope.
//! - Count the timestamps of a record that pass a whole `DoneFilter`.
//!
//! # Invariants
//! - `now` is captured once per query and reused for every timestamp.
//! - `Scope::Install` accepts every timestamp of an existing record.
//! - Clock rollback never errors; rolled-back entries satisfy any window.

use crate::model::record::{EpochMs, OccurrenceRecord};
use crate::model::scope::{DoneFilter, Scope};
use std::time::Duration;

/// Boundary values a query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeResolver {
    pub now: EpochMs,
    pub session_start_time: EpochMs,
    pub version_start_time: EpochMs,
}

impl ScopeResolver {
    pub fn counts(&self, scope: Scope, timestamp: EpochMs) -> bool {
        match scope {
            Scope::Session => timestamp >= self.session_start_time,
            Scope::Install => true,
            Scope::Version => timestamp >= self.version_start_time,
            Scope::Within(window) => self.within(window, timestamp),
        }
    }

    /// Number of done entries passing both the scope and the optional window.
    pub fn matching_count(&self, record: &OccurrenceRecord, filter: &DoneFilter) -> usize {
        record
            .done_timestamps
            .iter()
            .filter(|&&timestamp| self.counts(filter.scope, timestamp))
            .filter(|&&timestamp| {
                filter
                    .window
                    .map_or(true, |window| self.within(window, timestamp))
            })
            .count()
    }

    fn within(&self, window: Duration, timestamp: EpochMs) -> bool {
        let window_ms = EpochMs::try_from(window.as_millis()).unwrap_or(EpochMs::MAX);
        self.now.saturating_sub(timestamp) <= window_ms
    }
}
