//! The storage layer: fact and summary persistence, full-text search, and
//! aggregate statistics.
//!
//! All functions here are synchronous and take a [`rusqlite::Connection`];
//! async callers go through [`crate::db::Db::call`]. The layer is the only
//! writer of the `facts_fts` index, which it keeps in sync inside the same
//! transaction as every fact write.

pub mod search;
pub mod stats;
pub mod types;
pub mod write;
