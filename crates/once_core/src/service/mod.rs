//! Core use-case services.
//!
//! # Responsibility
//! - Resolve scopes against session, installation and version boundaries.
//! - Orchestrate record store calls into done/to-do entry points.

pub mod occurrence_service;
pub mod scope_resolver;
