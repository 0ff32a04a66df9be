//! Unified error types for the opportunity scanner.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the scanner.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Environment configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but holds invalid values.
    #[error("invalid settings: {0}")]
    Settings(#[from] ConfigError),

    /// Odds ingestion error.
    #[error("odds error: {0}")]
    Odds(#[from] OddsError),

    /// Opportunity detection error.
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// Result persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid configuration values.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A market name that is not h2h, spreads or totals.
    #[error("unknown market type: {0}")]
    InvalidMarket(String),

    /// A value outside its accepted range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A keyword list that does not compile into a matcher.
    #[error("invalid keyword pattern: {0}")]
    InvalidPattern(String),
}

/// Odds ingestion errors.
#[derive(Error, Debug)]
pub enum OddsError {
    /// The API rejected the key.
    #[error("odds api rejected the api key")]
    Unauthorized,

    /// Request quota exhausted; no further calls are made this pass.
    #[error("odds api request limit reached")]
    LimitReached,

    /// No API key and no offline file configured.
    #[error("no odds source configured: set ODDS_API_KEY or ODDS_FILE")]
    NoSource,

    /// Fetching odds for a sport failed.
    #[error("failed to fetch odds for {sport}: {reason}")]
    FetchFailed {
        /// Sport key that failed.
        sport: String,
        /// Reason for failure.
        reason: String,
    },

    /// Payload could not be decoded.
    #[error("failed to parse odds data: {0}")]
    ParseError(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Offline snapshot could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opportunity detection errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// Decimal odds at or below 1.0 have no implied probability.
    #[error("invalid decimal odds: {0}")]
    InvalidOdds(Decimal),

    /// Reference probabilities sum to zero and cannot be normalised.
    #[error("reference probabilities are degenerate")]
    DegenerateReference,
}

/// Result persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file could not be written or read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ScanError>;
