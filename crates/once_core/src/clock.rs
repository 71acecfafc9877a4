//! Wall-clock source for occurrence timestamps.
//!
//! # Invariants
//! - Values are Unix epoch milliseconds.
//! - No monotonicity is promised; callers tolerate rollback.

use crate::model::record::EpochMs;
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock {
    fn now_ms(&self) -> EpochMs;
}

/// Reads the operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        system_time_to_epoch_ms(SystemTime::now())
    }
}

/// Converts a system time to epoch milliseconds, clamping pre-epoch values to 0.
pub(crate) fn system_time_to_epoch_ms(time: SystemTime) -> EpochMs {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            EpochMs::try_from(elapsed.as_millis()).unwrap_or(EpochMs::MAX)
        })
}
