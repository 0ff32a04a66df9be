//! Running opportunity counts per league.
//!
//! Each pass records the current counts of a league and keeps the previous
//! pass's counts, so consumers can tell how many opportunities are new.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opportunity counts of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTally {
    /// Surebets.
    pub surebets: usize,
    /// Middles.
    pub middles: usize,
    /// Valuebets.
    pub valuebets: usize,
}

impl LeagueTally {
    /// Sum over categories.
    pub fn total(&self) -> usize {
        self.surebets + self.middles + self.valuebets
    }

    /// Per-category increase over `earlier`, floored at zero.
    pub fn increase_over(&self, earlier: &LeagueTally) -> LeagueTally {
        LeagueTally {
            surebets: self.surebets.saturating_sub(earlier.surebets),
            middles: self.middles.saturating_sub(earlier.middles),
            valuebets: self.valuebets.saturating_sub(earlier.valuebets),
        }
    }
}

/// Counts of one league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueCounts {
    /// Sport key.
    pub league: String,
    /// Sport group.
    pub sport_group: String,
    /// Counts of the latest pass.
    pub current: LeagueTally,
    /// Counts of the pass before.
    pub previous: LeagueTally,
    /// When the counts were last recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl LeagueCounts {
    /// Opportunities gained since the previous pass.
    pub fn fresh(&self) -> LeagueTally {
        self.current.increase_over(&self.previous)
    }
}

/// Per-league count storage.
pub trait CountStore: Send + Sync {
    /// Record a pass's counts, moving the current counts to `previous`.
    fn record(&self, league: &str, sport_group: &str, tally: LeagueTally) -> LeagueCounts;

    /// Counts of a league.
    fn get(&self, league: &str) -> Option<LeagueCounts>;

    /// Counts of every league, ordered by league key.
    fn all(&self) -> Vec<LeagueCounts>;
}

/// In-memory count store.
#[derive(Debug, Default)]
pub struct MemoryCountStore {
    counts: DashMap<String, LeagueCounts>,
}

impl MemoryCountStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CountStore for MemoryCountStore {
    fn record(&self, league: &str, sport_group: &str, tally: LeagueTally) -> LeagueCounts {
        let now = OffsetDateTime::now_utc();
        let mut entry = self
            .counts
            .entry(league.to_string())
            .or_insert_with(|| LeagueCounts {
                league: league.to_string(),
                sport_group: sport_group.to_string(),
                current: LeagueTally::default(),
                previous: LeagueTally::default(),
                updated_at: now,
            });

        let current = entry.current;
        entry.previous = current;
        entry.current = tally;
        entry.sport_group = sport_group.to_string();
        entry.updated_at = now;
        entry.clone()
    }

    fn get(&self, league: &str) -> Option<LeagueCounts> {
        self.counts.get(league).map(|c| c.value().clone())
    }

    fn all(&self) -> Vec<LeagueCounts> {
        let mut all: Vec<LeagueCounts> = self.counts.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.league.cmp(&b.league));
        all
    }
}
