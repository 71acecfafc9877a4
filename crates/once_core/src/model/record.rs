//! Persisted occurrence and installation records.
//!
//! # Responsibility
//! - Hold one tag's done history and pending to-do marker.
//! - Hold the single installation-wide boundary state.
//!
//! # Invariants
//! - `done_timestamps` keeps insertion order and is never deduplicated.
//! - Timestamps are not assumed to be non-decreasing (clock rollback).
//! - A to-do marker is satisfied by call order, not by timestamp comparison.
//! - `install_id` never changes for the life of an installation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unix epoch milliseconds.
pub type EpochMs = i64;

/// Done history and to-do marker for one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// One entry per `mark_done`, in call order.
    pub done_timestamps: Vec<EpochMs>,
    /// Latest redo request, if any was ever made.
    pub to_do_marker: Option<ToDoMarker>,
}

/// A redo request and the history length it was issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoMarker {
    pub requested_at: EpochMs,
    /// Number of done entries recorded before the request.
    pub done_before: usize,
}

impl OccurrenceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_done(&mut self, at: EpochMs) {
        self.done_timestamps.push(at);
    }

    /// Latest done timestamp by value, not by position.
    pub fn last_done(&self) -> Option<EpochMs> {
        self.done_timestamps.iter().copied().max()
    }

    /// Arms a redo request against the current history.
    pub fn request_redo(&mut self, at: EpochMs) {
        self.to_do_marker = Some(ToDoMarker {
            requested_at: at,
            done_before: self.done_timestamps.len(),
        });
    }

    /// Whether a to-do marker exists with no done entry recorded after it.
    ///
    /// Entries are ordered by position, so a request and a mark in the same
    /// millisecond still resolve in the order they were made.
    pub fn needs_doing(&self) -> bool {
        self.to_do_marker
            .is_some_and(|marker| self.done_timestamps.len() <= marker.done_before)
    }

    pub fn is_empty(&self) -> bool {
        self.done_timestamps.is_empty() && self.to_do_marker.is_none()
    }
}

/// Installation-wide state persisted next to the occurrence records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationState {
    pub install_id: Uuid,
    /// Creation time of this installation state.
    pub installed_at: EpochMs,
    /// Opaque version identity used only for change detection.
    pub version_marker: String,
    /// Start of the current version; lower bound of `Scope::Version`.
    pub version_start_time: EpochMs,
}

impl InstallationState {
    /// Creates a fresh installation with a generated id.
    pub fn fresh(
        installed_at: EpochMs,
        version_marker: impl Into<String>,
        version_start_time: EpochMs,
    ) -> Self {
        Self {
            install_id: Uuid::new_v4(),
            installed_at,
            version_marker: version_marker.into(),
            version_start_time,
        }
    }

    /// Adopts the oracle's view of the current version.
    ///
    /// Returns `true` when the marker differed and the boundary moved.
    /// Repeated calls with an unchanged marker leave the state untouched.
    pub fn observe_version(&mut self, marker: &str, start_time: EpochMs) -> bool {
        if self.version_marker == marker {
            return false;
        }
        self.version_marker = marker.to_string();
        self.version_start_time = start_time;
        true
    }
}
