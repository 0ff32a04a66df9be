//! Opportunity snapshots and the in-memory store.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::detector::{Category, Opportunity};
use crate::error::StoreError;

/// Persisted results of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Category stored.
    pub category: Category,
    /// When the snapshot was written.
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
    /// When the snapshot stops being served.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Records keyed by unique id.
    pub items: BTreeMap<String, Opportunity>,
}

impl Snapshot {
    /// Build a snapshot valid for `ttl` from now.
    pub fn new(category: Category, items: Vec<Opportunity>, ttl: Duration) -> Self {
        let saved_at = OffsetDateTime::now_utc();
        Self {
            category,
            saved_at,
            expires_at: saved_at + ttl,
            items: items
                .into_iter()
                .map(|item| (item.id().to_string(), item))
                .collect(),
        }
    }

    /// Whether the freshness window has passed.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Summary of the snapshot.
    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            category: self.category,
            saved_at: self.saved_at,
            expires_at: self.expires_at,
            count: self.items.len(),
        }
    }

    /// One page of records in id order.
    pub fn page(&self, offset: usize, limit: usize) -> Vec<&Opportunity> {
        self.items.values().skip(offset).take(limit).collect()
    }
}

/// Summary of a saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Category stored.
    pub category: Category,
    /// When the snapshot was written.
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
    /// When the snapshot stops being served.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Number of records.
    pub count: usize,
}

/// Destination of each pass's results.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    /// Replace the snapshot of a category.
    async fn save(
        &self,
        category: Category,
        items: Vec<Opportunity>,
    ) -> Result<SnapshotMeta, StoreError>;

    /// Latest unexpired snapshot of a category.
    async fn latest(&self, category: Category) -> Result<Option<Snapshot>, StoreError>;
}

/// Store keeping snapshots in memory.
#[derive(Debug)]
pub struct MemoryStore {
    ttl: Duration,
    snapshots: DashMap<Category, Snapshot>,
}

impl MemoryStore {
    /// Create a store whose snapshots live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshots: DashMap::new(),
        }
    }
}

#[async_trait]
impl OpportunityStore for MemoryStore {
    async fn save(
        &self,
        category: Category,
        items: Vec<Opportunity>,
    ) -> Result<SnapshotMeta, StoreError> {
        let snapshot = Snapshot::new(category, items, self.ttl);
        let meta = snapshot.meta();
        self.snapshots.insert(category, snapshot);
        debug!(category = %category, count = meta.count, "Saved snapshot");
        Ok(meta)
    }

    async fn latest(&self, category: Category) -> Result<Option<Snapshot>, StoreError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .snapshots
            .get(&category)
            .filter(|s| !s.is_expired(now))
            .map(|s| s.value().clone()))
    }
}
