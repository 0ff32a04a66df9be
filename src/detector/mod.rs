//! Opportunity detection.
//!
//! This module handles:
//! - Surebet, middle and valuebet detection per event
//! - Opportunity records
//! - Per-pass dedup and name-resolution state

pub mod middle;
pub mod record;
pub mod settings;
pub mod surebet;
pub mod valuebet;

use std::collections::HashSet;

use crate::error::DetectionError;
use crate::odds::{Event, MarketType, Sport};
use crate::pricing::{FuzzyMatcher, TeamMatcher};

pub use middle::{find_middles, MiddleDetector};
pub use record::{
    Category, MiddleRecord, Opportunity, OpportunityHeader, ReferenceSource, SurebetPoints,
    SurebetRecord, ValuebetRecord,
};
pub use settings::{
    DetectionSettings, LeagueTier, MiddleSettings, SurebetSettings, ValueSettings, WindowTable,
};
pub use surebet::{find_surebets, SurebetDetector};
pub use valuebet::{find_valuebets, ValuebetDetector};

/// A per-event opportunity detector.
pub trait Detector: Send + Sync {
    /// Record type produced.
    type Record;

    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Detect opportunities on one event.
    fn detect(
        &self,
        event: &Event,
        sport: &Sport,
        markets: &[MarketType],
        run: &mut RunState,
    ) -> Result<Vec<Self::Record>, DetectionError>;
}

/// Dedup keys already reported in the current pass.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    /// Record a key; `false` when it was already reported.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.keys.contains(key) {
            return false;
        }
        self.keys.insert(key.to_string())
    }

    /// Whether a key was reported.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key was reported.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// State owned by a single scan pass.
pub struct RunState {
    seen: [SeenSet; 3],
    matcher: Box<dyn TeamMatcher>,
}

impl RunState {
    /// Fresh state with fuzzy team matching.
    pub fn new() -> Self {
        Self::with_matcher(Box::new(FuzzyMatcher::default()))
    }

    /// Fresh state with a custom team matcher.
    pub fn with_matcher(matcher: Box<dyn TeamMatcher>) -> Self {
        Self {
            seen: Default::default(),
            matcher,
        }
    }

    /// Team matcher for this pass.
    pub fn matcher(&mut self) -> &mut dyn TeamMatcher {
        self.matcher.as_mut()
    }

    /// Dedup set of a category.
    pub fn seen(&mut self, category: Category) -> &mut SeenSet {
        &mut self.seen[category as usize]
    }

    /// Keys reported so far in a category.
    pub fn seen_count(&self, category: Category) -> usize {
        self.seen[category as usize].len()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunState")
            .field("surebets", &self.seen_count(Category::Surebets))
            .field("middles", &self.seen_count(Category::Middles))
            .field("valuebets", &self.seen_count(Category::Valuebets))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_set_reports_first_insert_only() {
        let mut seen = SeenSet::default();
        assert!(seen.insert("a"));
        assert!(!seen.insert("a"));
        assert!(seen.contains("a"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn run_state_keeps_categories_apart() {
        let mut run = RunState::new();
        assert!(run.seen(Category::Surebets).insert("k"));
        assert!(run.seen(Category::Middles).insert("k"));
        assert_eq!(run.seen_count(Category::Surebets), 1);
        assert_eq!(run.seen_count(Category::Valuebets), 0);
    }
}
