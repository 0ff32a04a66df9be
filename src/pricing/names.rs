//! Resolution of bookmaker participant names to the event's team names.
//!
//! Bookmakers spell teams differently ("Man Utd" vs "Manchester United"), so
//! spread outcomes are mapped onto the event's home/away names before prices
//! from different books are compared.

use std::collections::HashMap;

use tracing::trace;

/// Default similarity cutoff for fuzzy matching.
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Maps a raw participant name onto one of the event's team names.
pub trait TeamMatcher: Send {
    /// Resolve `raw` to `home` or `away`, `None` when neither matches.
    fn resolve(&mut self, raw: &str, home: &str, away: &str) -> Option<String>;
}

/// Case-insensitive exact matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl TeamMatcher for ExactMatcher {
    fn resolve(&mut self, raw: &str, home: &str, away: &str) -> Option<String> {
        let raw = raw.trim();
        [home, away]
            .into_iter()
            .find(|team| team.eq_ignore_ascii_case(raw))
            .map(str::to_string)
    }
}

/// Sequence-similarity matching with a per-instance cache.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    cutoff: f64,
    cache: HashMap<(String, String, String), Option<String>>,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF)
    }
}

impl FuzzyMatcher {
    /// Create a matcher accepting similarities at or above `cutoff`.
    pub fn new(cutoff: f64) -> Self {
        Self {
            cutoff,
            cache: HashMap::new(),
        }
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn best_match(&self, raw: &str, home: &str, away: &str) -> Option<String> {
        if let Some(exact) = ExactMatcher.resolve(raw, home, away) {
            return Some(exact);
        }

        let needle = raw.trim().to_lowercase();
        let home_score = similarity(&needle, &home.to_lowercase());
        let away_score = similarity(&needle, &away.to_lowercase());

        let (team, score) = if away_score > home_score {
            (away, away_score)
        } else {
            (home, home_score)
        };

        trace!(raw, team, score, "Fuzzy team match");
        (score >= self.cutoff).then(|| team.to_string())
    }
}

impl TeamMatcher for FuzzyMatcher {
    fn resolve(&mut self, raw: &str, home: &str, away: &str) -> Option<String> {
        let key = (raw.to_string(), home.to_string(), away.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let resolved = self.best_match(raw, home, away);
        self.cache.insert(key, resolved.clone());
        resolved
    }
}

/// Ratcliff/Obershelp similarity: `2 * matches / (len(a) + len(b))`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Characters shared by recursively taking the longest common block.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..start_a], &b[..start_b])
        + matching_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Longest common contiguous block, earliest in `a` then `b` on ties.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                row[j + 1] = prev[j] + 1;
                let len = row[j + 1];
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = row;
    }
    best
}
