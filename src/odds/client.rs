//! The Odds API (v4) client.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::source::{parse_events, OddsSource};
use super::types::{Event, Sport};
use crate::config::Config;
use crate::error::OddsError;
use crate::metrics;

/// Header carrying the remaining request quota.
const REMAINING_HEADER: &str = "x-requests-remaining";

/// How long requests are held back after a 401 or 429.
const LIMIT_COOLDOWN: Duration = Duration::from_secs(300);

/// HTTP client for The Odds API.
#[derive(Debug)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// API base URL.
    base_url: String,
    /// API key.
    api_key: String,
    /// Comma-separated bookmaker regions.
    regions: String,
    /// Comma-separated market keys.
    markets: String,
    /// Reference point for `limited_until_ms`.
    created: Instant,
    /// Milliseconds after `created` until which requests are held back, 0 when not limited.
    limited_until_ms: AtomicU64,
    /// Hold-back period after a 401 or 429.
    limit_cooldown: Duration,
    /// Remaining quota from the last response, -1 when unknown.
    remaining_requests: AtomicI64,
}

impl OddsApiClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, OddsError> {
        let api_key = config.odds_api_key.clone().ok_or(OddsError::NoSource)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            http,
            base_url: config.odds_api_url.trim_end_matches('/').to_string(),
            api_key,
            regions: config.odds_regions.join(","),
            markets: config.markets.join(","),
            created: Instant::now(),
            limited_until_ms: AtomicU64::new(0),
            limit_cooldown: LIMIT_COOLDOWN,
            remaining_requests: AtomicI64::new(-1),
        })
    }

    /// Override the hold-back period after a 401 or 429.
    pub fn with_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.limit_cooldown = cooldown;
        self
    }

    /// Whether the quota ran out or the key was rejected within the cooldown.
    pub fn limit_reached(&self) -> bool {
        let until = self.limited_until_ms.load(Ordering::SeqCst);
        until != 0 && (self.created.elapsed().as_millis() as u64) < until
    }

    fn flag_limit(&self) {
        let until = (self.created.elapsed() + self.limit_cooldown).as_millis() as u64;
        self.limited_until_ms.store(until.max(1), Ordering::SeqCst);
        warn!(
            cooldown_secs = self.limit_cooldown.as_secs(),
            "Odds API limit reached, holding back requests"
        );
    }

    /// Remaining requests reported by the last response.
    pub fn remaining_requests(&self) -> Option<u64> {
        u64::try_from(self.remaining_requests.load(Ordering::SeqCst)).ok()
    }

    /// Base URL in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn track_quota(&self, response: &reqwest::Response) {
        let remaining = response
            .headers()
            .get(REMAINING_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(remaining) = remaining {
            self.remaining_requests
                .store(remaining as i64, Ordering::SeqCst);
            metrics::set_quota_remaining(remaining.max(0.0) as u64);
            debug!(remaining, "Odds API quota");
        }
    }

    /// Map error statuses, flagging the client when no further calls should be made.
    fn check_status(&self, status: StatusCode, sport: &str) -> Result<(), OddsError> {
        match status {
            StatusCode::UNAUTHORIZED => {
                self.flag_limit();
                Err(OddsError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                self.flag_limit();
                Err(OddsError::LimitReached)
            }
            s if s.is_success() => Ok(()),
            s => Err(OddsError::FetchFailed {
                sport: sport.to_string(),
                reason: format!("HTTP {}", s),
            }),
        }
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    #[instrument(skip(self))]
    async fn sports(&self) -> Result<Vec<Sport>, OddsError> {
        if self.limit_reached() {
            return Err(OddsError::LimitReached);
        }

        let url = format!("{}/sports", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("all", "false")])
            .send()
            .await?;

        self.track_quota(&response);
        self.check_status(response.status(), "sports")?;

        let sports: Vec<Sport> = response
            .json()
            .await
            .map_err(|e| OddsError::ParseError(format!("Failed to parse sports: {}", e)))?;

        debug!(count = sports.len(), "Fetched sports");
        Ok(sports)
    }

    #[instrument(skip(self), fields(sport = %sport_key))]
    async fn events(&self, sport_key: &str) -> Result<Vec<Event>, OddsError> {
        if self.limit_reached() {
            return Err(OddsError::LimitReached);
        }

        let start = Instant::now();
        let url = format!("{}/sports/{}/odds", self.base_url, sport_key);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("markets", self.markets.as_str()),
                ("oddsFormat", "decimal"),
                ("dateFormat", "iso"),
                ("includeLinks", "true"),
            ])
            .send()
            .await?;

        self.track_quota(&response);

        // Unsupported market/sport combination.
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            warn!(sport = %sport_key, "Odds API rejected market selection, skipping sport");
            return Ok(Vec::new());
        }

        self.check_status(response.status(), sport_key)?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| OddsError::ParseError(format!("Failed to parse odds: {}", e)))?;

        metrics::record_odds_fetch_latency(start, sport_key);
        parse_events(payload, sport_key)
    }
}
