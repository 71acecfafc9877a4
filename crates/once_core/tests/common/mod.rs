#![allow(dead_code)]

use once_core::{
    Clock, EpochMs, OccurrenceEngine, SqliteRecordStore, StaticVersionOracle, VersionOracle,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const START_MS: EpochMs = 1_700_000_000_000;

/// Clock moved only by the test.
#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn at(ms: EpochMs) -> Self {
        Self(Arc::new(AtomicI64::new(ms)))
    }

    pub fn advance(&self, ms: i64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: EpochMs) {
        self.0.store(ms, Ordering::SeqCst);
    }

    pub fn now(&self) -> EpochMs {
        self.0.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMs {
        self.now()
    }
}

/// Oracle whose reported version can be swapped to simulate an app update.
#[derive(Clone)]
pub struct SharedOracle(Arc<Mutex<StaticVersionOracle>>);

impl SharedOracle {
    pub fn new(marker: &str, start_time: EpochMs) -> Self {
        Self(Arc::new(Mutex::new(StaticVersionOracle::new(marker, start_time))))
    }

    pub fn update(&self, marker: &str, start_time: EpochMs) {
        *self.current() = StaticVersionOracle::new(marker, start_time);
    }

    fn current(&self) -> MutexGuard<'_, StaticVersionOracle> {
        self.0.lock().expect("oracle lock should not be poisoned")
    }
}

impl VersionOracle for SharedOracle {
    fn version_marker(&self) -> String {
        self.current().version_marker()
    }

    fn version_start_time(&self) -> EpochMs {
        self.current().version_start_time()
    }
}

pub struct Harness {
    pub engine: OccurrenceEngine<SqliteRecordStore>,
    pub clock: ManualClock,
    pub oracle: SharedOracle,
}

impl Harness {
    /// Initialized engine over an in-memory store; version "1.0.0" started
    /// one hour before the clock.
    pub fn new() -> Self {
        let clock = ManualClock::at(START_MS);
        let oracle = SharedOracle::new("1.0.0", START_MS - 3_600_000);
        let engine = OccurrenceEngine::new(
            SqliteRecordStore::open_in_memory().expect("in-memory store should open"),
            clock.clone(),
            oracle.clone(),
        );
        engine.initialize().expect("initialize should succeed");
        Self {
            engine,
            clock,
            oracle,
        }
    }

    /// Reports a new version starting now and re-runs initialization.
    pub fn simulate_app_update(&self, marker: &str) {
        self.oracle.update(marker, self.clock.now());
        self.engine
            .initialize()
            .expect("initialize after an update should succeed");
    }
}
