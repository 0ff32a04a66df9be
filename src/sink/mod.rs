//! Result sink.
//!
//! This module handles:
//! - Per-category opportunity snapshots with a freshness window
//! - In-memory and JSON file stores
//! - Running per-league counts

pub mod counts;
pub mod file;
pub mod store;

pub use counts::{CountStore, LeagueCounts, LeagueTally, MemoryCountStore};
pub use file::JsonFileStore;
pub use store::{MemoryStore, OpportunityStore, Snapshot, SnapshotMeta};
