//! Sports odds scanner for surebets, middles and valuebets.
//!
//! The scanner pulls pre-match odds for every in-season sport, keeps the best
//! price per outcome across bookmakers, and publishes three kinds of
//! opportunity:
//!
//! ```text
//! Surebet:  1/2.10 + 1/2.05 = 0.9640 < 1   → 3.73% locked in
//! Middle:   Over 210.5 @ A, Under 212.5 @ B → both legs win on 211 or 212
//! Valuebet: fair 2.00 (sharp, de-vigged), offered 2.25 → EV 12.5%
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`odds`]: Odds snapshot types and sources
//! - [`pricing`]: Implied probability maths and best-price extraction
//! - [`detector`]: Surebet, middle and valuebet detection
//! - [`scanner`]: Scan passes and the scheduled loop
//! - [`sink`]: Opportunity snapshots and league counts
//! - [`api`]: HTTP API for results, health and metrics
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod metrics;
pub mod odds;
pub mod pricing;
pub mod scanner;
pub mod sink;
pub mod utils;

pub use config::Config;
pub use error::{Result, ScanError};
