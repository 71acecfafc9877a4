//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract used by the occurrence engine.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Store APIs return transport errors; undecodable rows read as absent.

pub mod record_repo;
