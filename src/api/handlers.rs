//! HTTP API handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::error;

use crate::detector::{Category, Opportunity};
use crate::scanner::{PassStatus, PassSummary};
use crate::sink::{CountStore, LeagueCounts, LeagueTally, OpportunityStore};

/// Default page size.
const DEFAULT_LIMIT: usize = 50;
/// Largest accepted page size.
const MAX_LIMIT: usize = 500;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest pass summary, `None` until the first pass finishes.
    pub status: PassStatus,
    /// Opportunity snapshots.
    pub store: Arc<dyn OpportunityStore>,
    /// Per-league counts.
    pub counts: Arc<dyn CountStore>,
    /// Prometheus exporter handle.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(
        status: PassStatus,
        store: Arc<dyn OpportunityStore>,
        counts: Arc<dyn CountStore>,
    ) -> Self {
        Self {
            status,
            store,
            counts,
            prometheus: None,
        }
    }

    /// Attach the Prometheus handle served on `/metrics`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Whether a pass has completed.
    pub async fn is_ready(&self) -> bool {
        self.status.read().await.is_some()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether a pass has completed.
    pub ready: bool,
    /// End of the latest pass.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_pass: Option<OffsetDateTime>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Latest pass.
    pub last_pass: Option<PassSummary>,
}

/// Pagination query.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
}

/// One page of opportunities.
#[derive(Debug, Serialize)]
pub struct OpportunityPage {
    /// Category served.
    pub category: Category,
    /// Page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Records in the snapshot.
    pub total: usize,
    /// When the snapshot was written.
    #[serde(with = "time::serde::rfc3339::option")]
    pub saved_at: Option<OffsetDateTime>,
    /// Records of this page.
    pub items: Vec<Opportunity>,
}

/// League counts with the increase since the previous pass.
#[derive(Debug, Serialize)]
pub struct LeagueResponse {
    /// Stored counts.
    #[serde(flatten)]
    pub counts: LeagueCounts,
    /// Increase since the previous pass.
    pub fresh: LeagueTally,
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once a pass has finished, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let last_pass = state.status.read().await.as_ref().map(|s| s.finished_at);
    let response = ReadyResponse {
        ready: last_pass.is_some(),
        last_pass,
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns the latest pass summary.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let last_pass = state.status.read().await.clone();
    let status = if last_pass.is_some() {
        "running"
    } else {
        "starting"
    };

    Json(StatusResponse { status, last_pass })
}

/// Opportunities handler - returns one page of the latest fresh snapshot.
pub async fn opportunities(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    let Ok(category) = Category::from_str(&category) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown category: {}", category),
        );
    };

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let snapshot = match state.store.latest(category).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(category = %category, error = %e, "Failed to read snapshot");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read results");
        }
    };

    let (total, saved_at, items) = match &snapshot {
        Some(snapshot) => (
            snapshot.len(),
            Some(snapshot.saved_at),
            snapshot
                .page((page - 1).saturating_mul(limit), limit)
                .into_iter()
                .cloned()
                .collect(),
        ),
        None => (0, None, Vec::new()),
    };

    Json(OpportunityPage {
        category,
        page,
        limit,
        total,
        saved_at,
        items,
    })
    .into_response()
}

/// Leagues handler - returns running counts per league.
pub async fn leagues(State(state): State<AppState>) -> impl IntoResponse {
    let leagues: Vec<LeagueResponse> = state
        .counts
        .all()
        .into_iter()
        .map(|counts| LeagueResponse {
            fresh: counts.fresh(),
            counts,
        })
        .collect();
    Json(leagues)
}

/// Metrics handler - renders the Prometheus exposition format.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "metrics exporter not installed"),
    }
}
