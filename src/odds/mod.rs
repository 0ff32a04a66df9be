//! Odds ingestion module.
//!
//! This module handles:
//! - Event/bookmaker/market/outcome snapshot types
//! - The Odds API client
//! - Offline snapshot files
//! - Mock source for testing

pub mod client;
pub mod mock;
pub mod offline;
pub mod source;
pub mod types;

pub use client::OddsApiClient;
pub use mock::{MockEventBuilder, MockOddsSource};
pub use offline::OfflineSource;
pub use source::{parse_events, OddsSource};
pub use types::{BookmakerQuote, Event, Market, MarketType, Outcome, Sport};
