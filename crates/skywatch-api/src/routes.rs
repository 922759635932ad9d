//! HTTP handlers.
//!
//! | Method | Path           | Body                                         |
//! |--------|----------------|----------------------------------------------|
//! | GET    | `/api/events`  | `{ count, events, last_updated, sources }`   |
//! | POST   | `/api/update`  | `{ "status": "cache updated" }`              |
//! | GET    | `/api/sources` | `{ last_updated, sources: [tally] }`         |
//! | GET    | `/health`      | `{ "status": "ok", "uptime_secs" }`          |

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use skywatch_aggregation::{Event, RefreshOutcome, SourceTally};
use tracing::{debug, info, warn};

use crate::server::AppState;

pub const UPDATE_STATUS: &str = "cache updated";

/// Borrows the events straight out of the shared snapshot.
#[derive(Debug, Serialize)]
pub struct EventsResponse<'a> {
    pub count: usize,
    pub events: &'a [Event],
    pub last_updated: Option<DateTime<Utc>>,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub last_updated: Option<DateTime<Utc>>,
    pub sources: Vec<SourceTally>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

pub fn router() -> Router {
    Router::new()
        .route("/api/events", get(get_events))
        .route("/api/update", post(post_update))
        .route("/api/sources", get(get_sources))
}

/// Serve the snapshot, populating it first if nothing was ever committed.
pub async fn get_events(Extension(state): Extension<Arc<AppState>>) -> Response {
    if let Some(outcome) = state.cache.ensure_populated().await {
        debug!(?outcome, "populated empty cache on read");
    }

    let snapshot = state.cache.snapshot();
    Json(EventsResponse {
        count: snapshot.events.len(),
        events: &snapshot.events,
        last_updated: snapshot.last_updated,
        sources: state.cache.descriptions(),
    })
    .into_response()
}

/// Force a refresh. The answer is the same whatever the refresh did.
pub async fn post_update(Extension(state): Extension<Arc<AppState>>) -> Json<UpdateResponse> {
    match state.cache.refresh().await {
        RefreshOutcome::Refreshed { events } => info!(events, "cache updated on request"),
        RefreshOutcome::Joined => info!("update request joined in-flight refresh"),
        RefreshOutcome::Failed { reason } => {
            warn!(%reason, "requested refresh failed; previous snapshot kept")
        }
    }
    Json(UpdateResponse {
        status: UPDATE_STATUS,
    })
}

pub async fn get_sources(Extension(state): Extension<Arc<AppState>>) -> Json<SourcesResponse> {
    let snapshot = state.cache.snapshot();
    Json(SourcesResponse {
        last_updated: snapshot.last_updated,
        sources: snapshot.tallies.clone(),
    })
}

pub async fn get_health(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
