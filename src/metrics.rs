//! Prometheus metrics for scan throughput and latency.
//!
//! This module provides metrics for:
//! - Events scanned per pass
//! - Opportunities detected per category
//! - Detector and sport failures
//! - Pass and odds fetch latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Full scan pass latency metric name.
pub const METRIC_PASS_LATENCY: &str = "scan_pass_latency_ms";
/// Odds fetch latency metric name.
pub const METRIC_ODDS_FETCH_LATENCY: &str = "odds_fetch_latency_ms";
/// Events scanned counter metric name.
pub const METRIC_EVENTS_SCANNED: &str = "events_scanned_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";
/// Detector failures counter metric name.
pub const METRIC_DETECTOR_FAILURES: &str = "detector_failures_total";
/// Sport fetch failures counter metric name.
pub const METRIC_SPORT_FAILURES: &str = "sport_failures_total";
/// Completed passes counter metric name.
pub const METRIC_PASSES_COMPLETED: &str = "scan_passes_total";
/// Remaining odds API quota gauge metric name.
pub const METRIC_ODDS_QUOTA_REMAINING: &str = "odds_quota_remaining";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(METRIC_PASS_LATENCY, "Full scan pass latency in milliseconds");
    describe_histogram!(
        METRIC_ODDS_FETCH_LATENCY,
        "Odds fetch latency per sport in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_EVENTS_SCANNED, "Total number of events scanned");
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of opportunities detected, by category"
    );
    describe_counter!(
        METRIC_DETECTOR_FAILURES,
        "Total number of per-event detector failures"
    );
    describe_counter!(
        METRIC_SPORT_FAILURES,
        "Total number of sports whose odds could not be fetched"
    );
    describe_counter!(METRIC_PASSES_COMPLETED, "Total number of completed scan passes");

    describe_gauge!(
        METRIC_ODDS_QUOTA_REMAINING,
        "Remaining odds API requests reported by the last response"
    );

    debug!("Metrics initialized");
}

/// Record odds fetch latency for a sport.
pub fn record_odds_fetch_latency(start: Instant, sport: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_ODDS_FETCH_LATENCY, "sport" => sport.to_string()).record(latency_ms);
}

/// Add to the events scanned counter.
pub fn add_events_scanned(count: usize) {
    counter!(METRIC_EVENTS_SCANNED).increment(count as u64);
}

/// Add to the opportunities counter for a category.
pub fn add_opportunities_detected(category: &str, count: usize) {
    counter!(METRIC_OPPORTUNITIES_DETECTED, "category" => category.to_string())
        .increment(count as u64);
}

/// Increment the detector failure counter.
pub fn inc_detector_failures(detector: &'static str) {
    counter!(METRIC_DETECTOR_FAILURES, "detector" => detector).increment(1);
}

/// Increment the sport failure counter.
pub fn inc_sport_failures() {
    counter!(METRIC_SPORT_FAILURES).increment(1);
}

/// Increment the completed passes counter.
pub fn inc_passes_completed() {
    counter!(METRIC_PASSES_COMPLETED).increment(1);
}

/// Set the remaining quota gauge.
pub fn set_quota_remaining(remaining: u64) {
    gauge!(METRIC_ODDS_QUOTA_REMAINING).set(remaining as f64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a scan pass.
pub fn timer_pass() -> LatencyTimer {
    LatencyTimer::new(METRIC_PASS_LATENCY)
}
