//! # worklist
//!
//! Progress tracking for large, filtered collections of spatial features.
//!
//! A work list walks the user through features ("work items") one at a time.
//! Per-item progress (visited, status) is kept apart from the authoritative
//! source tables in a sorted-index state cache and persisted to a definition
//! file (XML or JSON) across sessions.

pub mod config;
pub mod definition;
pub mod error;
pub mod model;
pub mod query;
pub mod registry;
pub mod repository;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod tracking;
pub mod worklist;
