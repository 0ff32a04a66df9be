//! JSON file store, one file per category.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::store::{OpportunityStore, Snapshot, SnapshotMeta};
use crate::detector::{Category, Opportunity};
use crate::error::StoreError;

/// Store writing `<dir>/<category>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    ttl: Duration,
}

impl JsonFileStore {
    /// Create a store in `dir` whose snapshots live for `ttl`.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a category.
    pub fn path_for(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.json", category))
    }
}

#[async_trait]
impl OpportunityStore for JsonFileStore {
    #[instrument(skip(self, items), fields(dir = %self.dir.display()))]
    async fn save(
        &self,
        category: Category,
        items: Vec<Opportunity>,
    ) -> Result<SnapshotMeta, StoreError> {
        let snapshot = Snapshot::new(category, items, self.ttl);
        let payload = serde_json::to_vec_pretty(&snapshot)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(category);
        let tmp = self.dir.join(format!(".{}.json.tmp", category));
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), count = snapshot.len(), "Wrote snapshot");
        Ok(snapshot.meta())
    }

    async fn latest(&self, category: Category) -> Result<Option<Snapshot>, StoreError> {
        let raw = match tokio::fs::read(self.path_for(category)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        if snapshot.is_expired(OffsetDateTime::now_utc()) {
            return Ok(None);
        }
        Ok(Some(snapshot))
    }
}
