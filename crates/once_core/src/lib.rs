//! Occurrence tracking for embedded applications.
//!
//! Answers "has this tagged action already happened?" under session,
//! installation, version or rolling-window scopes, and "does it still need to
//! happen?", with state that survives process restarts.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod version;

pub use clock::{Clock, SystemClock};
pub use config::{open_engine, EngineConfig, DEFAULT_DB_FILE_NAME};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{EpochMs, InstallationState, OccurrenceRecord, ToDoMarker};
pub use model::scope::{CountComparator, DoneFilter, Scope};
pub use repo::record_repo::{RecordStore, RepoError, RepoResult, SqliteRecordStore};
pub use service::occurrence_service::{EngineError, EngineResult, OccurrenceEngine};
pub use service::scope_resolver::ScopeResolver;
pub use version::{ExecutableVersionOracle, StaticVersionOracle, VersionOracle};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
