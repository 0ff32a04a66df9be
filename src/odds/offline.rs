//! Offline odds snapshot loaded from a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::source::{parse_events, OddsSource};
use super::types::{Event, Sport};
use crate::error::OddsError;

/// Snapshot file layout: `{ "sports": [...], "odds": { "<sport_key>": [...] } }`.
#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    sports: Vec<Sport>,
    #[serde(default)]
    odds: HashMap<String, Value>,
}

/// Odds source backed by a saved snapshot.
#[derive(Debug, Clone)]
pub struct OfflineSource {
    path: PathBuf,
}

impl OfflineSource {
    /// Create a source reading from the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SnapshotFile, OddsError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            OddsError::ParseError(format!(
                "Failed to parse snapshot {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

#[async_trait]
impl OddsSource for OfflineSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn sports(&self) -> Result<Vec<Sport>, OddsError> {
        let snapshot = self.load().await?;
        debug!(count = snapshot.sports.len(), "Loaded offline sports");
        Ok(snapshot.sports)
    }

    #[instrument(skip(self), fields(sport = %sport_key))]
    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, OddsError> {
        let mut snapshot = self.load().await?;
        match snapshot.odds.remove(sport_key) {
            Some(payload) => parse_events(payload, sport_key),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "sports": [{"key": "basketball_nba", "group": "Basketball", "title": "NBA"}],
        "odds": {
            "basketball_nba": [{
                "id": "e1",
                "sport_key": "basketball_nba",
                "sport_title": "NBA",
                "commence_time": "2026-10-20T23:30:00Z",
                "home_team": "Boston Celtics",
                "away_team": "New York Knicks",
                "bookmakers": []
            }]
        }
    }"#;

    #[tokio::test]
    async fn offline_source_reads_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        let source = OfflineSource::new(file.path());

        let sports = source.sports().await.unwrap();
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].group, "Basketball");

        let events = source.events("basketball_nba").await.unwrap();
        assert_eq!(events.len(), 1);

        let missing = source.events("soccer_epl").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn offline_source_missing_file_is_error() {
        let source = OfflineSource::new("/nonexistent/snapshot.json");
        assert!(matches!(source.sports().await, Err(OddsError::Io(_))));
    }
}
