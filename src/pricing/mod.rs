//! Pricing primitives shared by the detectors.
//!
//! This module handles:
//! - Implied probability, margin and de-vig math
//! - Outcome keys
//! - Team-name resolution
//! - Extraction of per-market price tables from raw quotes

pub mod extractor;
pub mod key;
pub mod names;
pub mod probability;

pub use extractor::{extract, BestPrice, MarketBook};
pub use key::OutcomeKey;
pub use names::{ExactMatcher, FuzzyMatcher, TeamMatcher};
