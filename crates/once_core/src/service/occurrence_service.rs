//! Occurrence engine: record, query and re-request tagged actions.
//!
//! # Responsibility
//! - Provide the done/to-do entry points for application code.
//! - Own session state and the cached installation state.
//! - Combine record store, scope resolver and clock per call.
//!
//! # Invariants
//! - Every operation other than `initialize` fails with
//!   `EngineError::NotInitialized` until `initialize` has succeeded.
//! - All store access happens under one lock, so calls on the same tag are
//!   linearizable and concurrent `mark_done` calls never lose an entry.
//! - In-memory state changes only after the matching store write succeeded.
//! - A tag without done entries is "not done" whatever comparator is asked.

use crate::clock::Clock;
use crate::model::record::{EpochMs, InstallationState, OccurrenceRecord};
use crate::model::scope::{DoneFilter, Scope};
use crate::repo::record_repo::{RecordStore, RepoError};
use crate::service::scope_resolver::ScopeResolver;
use crate::version::VersionOracle;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug)]
pub enum EngineError {
    /// An operation ran before `initialize()`.
    NotInitialized,
    Storage(RepoError),
    /// A previous caller panicked while holding the engine lock.
    LockPoisoned,
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "occurrence engine used before initialize()"),
            Self::Storage(err) => write!(f, "record store failure: {err}"),
            Self::LockPoisoned => write!(f, "occurrence engine lock poisoned"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::NotInitialized | Self::LockPoisoned => None,
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

struct Boundaries {
    installation: InstallationState,
    session_start_time: EpochMs,
}

impl Boundaries {
    fn resolver(&self, now: EpochMs) -> ScopeResolver {
        ScopeResolver {
            now,
            session_start_time: self.session_start_time,
            version_start_time: self.installation.version_start_time,
        }
    }
}

struct EngineState<S> {
    store: S,
    boundaries: Option<Boundaries>,
}

/// Long-lived occurrence engine; construct once and share by reference.
pub struct OccurrenceEngine<S: RecordStore> {
    clock: Box<dyn Clock + Send + Sync>,
    oracle: Box<dyn VersionOracle + Send + Sync>,
    state: Mutex<EngineState<S>>,
}

impl<S: RecordStore> OccurrenceEngine<S> {
    /// Creates an uninitialized engine over the given collaborators.
    pub fn new(
        store: S,
        clock: impl Clock + Send + Sync + 'static,
        oracle: impl VersionOracle + Send + Sync + 'static,
    ) -> Self {
        Self {
            clock: Box::new(clock),
            oracle: Box::new(oracle),
            state: Mutex::new(EngineState {
                store,
                boundaries: None,
            }),
        }
    }

    /// Loads installation state and checks the host version.
    ///
    /// The first call creates the installation state when the store has none
    /// and starts the session. Later calls keep the session start and only
    /// move the version boundary when the oracle reports a different marker.
    ///
    /// # Errors
    /// - `Storage` when the installation state cannot be read or written; the
    ///   engine then stays in its previous state.
    pub fn initialize(&self) -> EngineResult<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let now = self.clock.now_ms();
        let marker = self.oracle.version_marker();
        let version_start_time = self.oracle.version_start_time();

        let installation = match state.store.load_installation_state()? {
            Some(mut installation) => {
                if installation.observe_version(&marker, version_start_time) {
                    state.store.store_installation_state(&installation)?;
                    info!(
                        "event=version_change module=engine status=ok version_start_time={}",
                        version_start_time
                    );
                }
                installation
            }
            None => {
                let installation = InstallationState::fresh(now, marker, version_start_time);
                state.store.store_installation_state(&installation)?;
                info!(
                    "event=install_created module=engine status=ok install_id={}",
                    installation.install_id
                );
                installation
            }
        };

        let session_start_time = state
            .boundaries
            .as_ref()
            .map_or(now, |boundaries| boundaries.session_start_time);
        state.boundaries = Some(Boundaries {
            installation,
            session_start_time,
        });
        info!(
            "event=engine_init module=engine status=ok session_start_time={}",
            session_start_time
        );
        Ok(())
    }

    /// Records one occurrence of `tag` at the current time.
    pub fn mark_done(&self, tag: &str) -> EngineResult<()> {
        let mut guard = self.lock()?;
        let (store, _) = initialized(&mut *guard)?;
        let now = self.clock.now_ms();
        store.append_done(tag, now).inspect_err(|err| {
            error!(
                "event=mark_done module=engine status=error tag_len={} error={}",
                tag.len(),
                err
            );
        })?;
        debug!("event=mark_done module=engine status=ok tag_len={}", tag.len());
        Ok(())
    }

    /// Answers whether `tag` was done under `filter`.
    ///
    /// Without a comparator this is "at least once"; with one, the comparator
    /// decides on the matching count.
    pub fn been_done(&self, tag: &str, filter: &DoneFilter) -> EngineResult<bool> {
        let mut guard = self.lock()?;
        let (store, boundaries) = initialized(&mut *guard)?;
        let record = store.load(tag)?;
        Ok(evaluate(
            record.as_ref(),
            filter,
            &boundaries.resolver(self.clock.now_ms()),
        ))
    }

    /// Number of occurrences matching the filter's scope and window.
    ///
    /// `filter.count` is ignored.
    pub fn done_count(&self, tag: &str, filter: &DoneFilter) -> EngineResult<usize> {
        let mut guard = self.lock()?;
        let (store, boundaries) = initialized(&mut *guard)?;
        let resolver = boundaries.resolver(self.clock.now_ms());
        Ok(store
            .load(tag)?
            .map_or(0, |record| resolver.matching_count(&record, filter)))
    }

    /// Latest done timestamp across all scopes.
    pub fn last_done(&self, tag: &str) -> EngineResult<Option<EpochMs>> {
        let mut guard = self.lock()?;
        let (store, _) = initialized(&mut *guard)?;
        Ok(store.load(tag)?.and_then(|record| record.last_done()))
    }

    /// Removes the whole record of `tag`, including any to-do marker.
    pub fn clear_done(&self, tag: &str) -> EngineResult<()> {
        let mut guard = self.lock()?;
        let (store, _) = initialized(&mut *guard)?;
        store.delete(tag)?;
        debug!("event=clear_done module=engine status=ok tag_len={}", tag.len());
        Ok(())
    }

    /// Deletes every record and starts a new installation and session.
    ///
    /// Not recoverable. The version baseline is re-read from the oracle.
    pub fn clear_all(&self) -> EngineResult<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if state.boundaries.is_none() {
            return Err(EngineError::NotInitialized);
        }

        let now = self.clock.now_ms();
        let fresh = InstallationState::fresh(
            now,
            self.oracle.version_marker(),
            self.oracle.version_start_time(),
        );
        state.store.delete_all(&fresh).inspect_err(|err| {
            error!("event=clear_all module=engine status=error error={}", err);
        })?;
        info!(
            "event=clear_all module=engine status=ok install_id={}",
            fresh.install_id
        );
        state.boundaries = Some(Boundaries {
            installation: fresh,
            session_start_time: now,
        });
        Ok(())
    }

    /// Requests that `tag` be (re)done.
    ///
    /// With `None` the marker is always set. With `Some(scope)` nothing
    /// happens when the tag is already done within that scope.
    /// Only a `mark_done` made after this call satisfies the marker, even
    /// within the same millisecond. Returns whether a marker was written.
    pub fn to_do(&self, tag: &str, scope: Option<Scope>) -> EngineResult<bool> {
        let mut guard = self.lock()?;
        let (store, boundaries) = initialized(&mut *guard)?;
        let now = self.clock.now_ms();

        if let Some(scope) = scope {
            let record = store.load(tag)?;
            let filter = DoneFilter::in_scope(scope);
            if evaluate(record.as_ref(), &filter, &boundaries.resolver(now)) {
                debug!(
                    "event=to_do module=engine status=skipped tag_len={} scope={:?}",
                    tag.len(),
                    scope
                );
                return Ok(false);
            }
        }

        store.set_to_do_marker(tag, now)?;
        debug!("event=to_do module=engine status=ok tag_len={}", tag.len());
        Ok(true)
    }

    /// Whether a to-do request for `tag` has no `mark_done` after it.
    pub fn need_to_do(&self, tag: &str) -> EngineResult<bool> {
        let mut guard = self.lock()?;
        let (store, _) = initialized(&mut *guard)?;
        Ok(store.load(tag)?.is_some_and(|record| record.needs_doing()))
    }

    /// Every tag with a stored record, ascending.
    pub fn tags(&self) -> EngineResult<Vec<String>> {
        let mut guard = self.lock()?;
        let (store, _) = initialized(&mut *guard)?;
        Ok(store.tags()?)
    }

    pub fn install_id(&self) -> EngineResult<Uuid> {
        Ok(self.installation_state()?.install_id)
    }

    /// Snapshot of the cached installation state.
    pub fn installation_state(&self) -> EngineResult<InstallationState> {
        let guard = self.lock()?;
        guard
            .boundaries
            .as_ref()
            .map(|boundaries| boundaries.installation.clone())
            .ok_or(EngineError::NotInitialized)
    }

    pub fn session_start_time(&self) -> EngineResult<EpochMs> {
        let guard = self.lock()?;
        guard
            .boundaries
            .as_ref()
            .map(|boundaries| boundaries.session_start_time)
            .ok_or(EngineError::NotInitialized)
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, EngineState<S>>> {
        self.state.lock().map_err(|_| EngineError::LockPoisoned)
    }
}

fn initialized<S>(state: &mut EngineState<S>) -> EngineResult<(&mut S, &Boundaries)> {
    let EngineState { store, boundaries } = state;
    let boundaries = boundaries.as_ref().ok_or(EngineError::NotInitialized)?;
    Ok((store, boundaries))
}

fn evaluate(
    record: Option<&OccurrenceRecord>,
    filter: &DoneFilter,
    resolver: &ScopeResolver,
) -> bool {
    let Some(record) = record.filter(|record| !record.done_timestamps.is_empty()) else {
        return false;
    };
    let count = resolver.matching_count(record, filter);
    match filter.count {
        Some(comparator) => comparator.matches(count),
        None => count > 0,
    }
}
