//! Async scan passes over every in-season sport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::engine::{detect_batch, DetectionBatch, Detectors};
use crate::detector::{Category, DetectionSettings, RunState};
use crate::error::{OddsError, StoreError};
use crate::metrics;
use crate::odds::{MarketType, OddsSource, Sport};
use crate::sink::{CountStore, OpportunityStore};

/// Outcome of one scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Sports whose events were fetched.
    pub sports_scanned: usize,
    /// Sports skipped because fetching failed.
    pub sports_failed: usize,
    /// Events scanned.
    pub events: usize,
    /// Surebets found.
    pub surebets: usize,
    /// Middles found.
    pub middles: usize,
    /// Valuebets found.
    pub valuebets: usize,
    /// Detector runs that failed.
    pub failures: usize,
    /// Whether the odds quota ran out during the pass.
    pub limit_reached: bool,
    /// Pass start.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    /// Pass end.
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

/// Shared view of the latest pass.
pub type PassStatus = Arc<RwLock<Option<PassSummary>>>;

/// Scan scheduler.
pub struct Scanner {
    source: Arc<dyn OddsSource>,
    store: Arc<dyn OpportunityStore>,
    counts: Arc<dyn CountStore>,
    detectors: Detectors,
    markets: Vec<MarketType>,
    sport_filter: Vec<String>,
    status: PassStatus,
}

impl Scanner {
    /// Create a scanner.
    pub fn new(
        source: Arc<dyn OddsSource>,
        store: Arc<dyn OpportunityStore>,
        counts: Arc<dyn CountStore>,
        settings: &DetectionSettings,
    ) -> Self {
        Self {
            source,
            store,
            counts,
            detectors: Detectors::from_settings(settings),
            markets: settings.markets.clone(),
            sport_filter: Vec::new(),
            status: Arc::new(RwLock::new(None)),
        }
    }

    /// Restrict passes to these sport keys.
    pub fn with_sport_filter(mut self, sports: Vec<String>) -> Self {
        self.sport_filter = sports
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    /// Handle to the latest pass summary.
    pub fn status(&self) -> PassStatus {
        Arc::clone(&self.status)
    }

    /// Fetch in-season sports, applying the sport filter.
    pub async fn sports(&self) -> Result<Vec<Sport>, OddsError> {
        let sports = self.source.sports().await?;
        Ok(sports
            .into_iter()
            .filter(|s| s.active)
            .filter(|s| self.sport_filter.is_empty() || self.sport_filter.contains(&s.key))
            .collect())
    }

    /// Scan every sport once and persist the results.
    #[instrument(skip_all, fields(sports = sports.len()))]
    pub async fn run_pass(&self, sports: &[Sport]) -> Result<PassSummary, StoreError> {
        let _timer = metrics::timer_pass();
        let started_at = OffsetDateTime::now_utc();
        let mut run = RunState::new();
        let mut total = DetectionBatch::default();
        let mut sports_scanned = 0;
        let mut sports_failed = 0;
        let mut limit_reached = false;

        for sport in sports {
            if sport.has_outrights {
                debug!(sport = %sport.key, "Skipping outright-only sport");
                continue;
            }

            let events = match self.source.events(&sport.key).await {
                Ok(events) => events,
                Err(e @ (OddsError::LimitReached | OddsError::Unauthorized)) => {
                    warn!(sport = %sport.key, error = %e, "Odds quota unavailable, stopping pass");
                    metrics::inc_sport_failures();
                    sports_failed += 1;
                    limit_reached = true;
                    break;
                }
                Err(e) => {
                    warn!(sport = %sport.key, error = %e, "Failed to fetch odds, skipping sport");
                    metrics::inc_sport_failures();
                    sports_failed += 1;
                    continue;
                }
            };

            sports_scanned += 1;
            let batch = detect_batch(&events, sport, &self.markets, &self.detectors, &mut run);
            let counts = self.counts.record(&sport.key, &sport.group, batch.tally());
            debug!(
                sport = %sport.key,
                events = batch.events,
                found = counts.current.total(),
                fresh = counts.fresh().total(),
                "Sport scanned"
            );
            total.merge(batch);
        }

        for category in Category::ALL {
            let items = total.opportunities(category);
            metrics::add_opportunities_detected(&category.to_string(), items.len());
            self.store.save(category, items).await?;
        }
        metrics::add_events_scanned(total.events);
        metrics::inc_passes_completed();

        let summary = PassSummary {
            sports_scanned,
            sports_failed,
            events: total.events,
            surebets: total.surebets.len(),
            middles: total.middles.len(),
            valuebets: total.valuebets.len(),
            failures: total.failures,
            limit_reached,
            started_at,
            finished_at: OffsetDateTime::now_utc(),
        };

        info!(
            sports = summary.sports_scanned,
            failed = summary.sports_failed,
            events = summary.events,
            surebets = summary.surebets,
            middles = summary.middles,
            valuebets = summary.valuebets,
            "Scan pass complete"
        );

        *self.status.write().await = Some(summary.clone());
        Ok(summary)
    }

    /// Fetch sports and run one pass.
    pub async fn scan_once(&self) -> crate::Result<PassSummary> {
        let sports = self.sports().await?;
        Ok(self.run_pass(&sports).await?)
    }

    /// Run passes every `interval` until `shutdown` resolves.
    pub async fn run_forever<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "Starting scan loop");

        loop {
            // A pass in flight always runs to completion so every category is saved.
            let pass = self.scan_once();
            tokio::pin!(pass);
            let mut stopping = false;
            let result = loop {
                tokio::select! {
                    result = &mut pass => break result,
                    _ = &mut shutdown, if !stopping => {
                        info!("Shutdown requested, finishing current pass");
                        stopping = true;
                    }
                }
            };

            if let Err(e) = result {
                error!(error = %e, "Scan pass failed");
            }
            if stopping {
                break;
            }

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Scan loop stopped");
    }
}
