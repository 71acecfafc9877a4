//! Domain model for occurrence tracking.
//!
//! # Responsibility
//! - Define the records persisted per tag and per installation.
//! - Define the query vocabulary (scopes, comparators, filters).
//!
//! # Invariants
//! - Tags are opaque, case-sensitive strings; the empty string is valid.
//! - Model types carry no storage or clock dependencies.

pub mod record;
pub mod scope;
