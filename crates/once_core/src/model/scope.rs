//! Query vocabulary: scopes, count comparators and the combined filter.
//!
//! # Responsibility
//! - Name the lifetimes a "done" question can be asked against.
//! - Carry every query knob in one structured value instead of overloads.
//!
//! # Invariants
//! - `Scope::default()` is `Scope::Install`.
//! - `DoneFilter::default()` matches "done at least once this installation".

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Temporal lifetime a done-query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Since the engine was initialized in this process.
    Session,
    /// Since the installation state was created.
    #[default]
    Install,
    /// Since the host application's current version started.
    Version,
    /// Within a rolling window ending at the query's `now`.
    Within(Duration),
}

/// Comparison applied to the number of matching occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountComparator {
    Exactly(i64),
    MoreThan(i64),
    LessThan(i64),
}

impl CountComparator {
    /// Evaluates the comparator against an occurrence count.
    pub fn matches(self, count: usize) -> bool {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        match self {
            Self::Exactly(n) => count == n,
            Self::MoreThan(n) => count > n,
            Self::LessThan(n) => count < n,
        }
    }
}

/// Structured done-query filter.
///
/// Built through chained setters:
///
/// ```
/// use once_core::{CountComparator, DoneFilter, Scope};
/// use std::time::Duration;
///
/// let filter = DoneFilter::new()
///     .scope(Scope::Version)
///     .within(Duration::from_secs(60))
///     .count(CountComparator::MoreThan(2));
/// assert_eq!(filter.scope, Scope::Version);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DoneFilter {
    pub scope: Scope,
    /// Extra rolling window applied on top of `scope`.
    pub window: Option<Duration>,
    /// When absent the query asks "at least once".
    pub count: Option<CountComparator>,
}

impl DoneFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a filter with only a scope set.
    pub fn in_scope(scope: Scope) -> Self {
        Self::new().scope(scope)
    }

    /// Shortcut for "done within the last `window`", install-wide.
    pub fn within_last(window: Duration) -> Self {
        Self::new().within(window)
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn within(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn count(mut self, comparator: CountComparator) -> Self {
        self.count = Some(comparator);
        self
    }
}
