//! Event cache, the single shared snapshot served to readers.
//!
//! ```text
//! empty ──refresh──▶ populated ──refresh──▶ populated
//! ```
//!
//! A refresh runs Coordinator → Merger in a spawned task and then swaps in a
//! brand new [`CacheSnapshot`]. Readers clone the current `Arc` and never wait
//! on a refresh; they see either the previous snapshot or the next one.
//!
//! Refreshes are single-flight: while one is running, further callers wait
//! for it and return [`RefreshOutcome::Joined`] instead of starting another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::AggregatorConfig;
use crate::coordinator::{FetchCoordinator, SourceTally};
use crate::error::SourceError;
use crate::event::Event;
use crate::merge::merge_events;
use crate::sources::RefreshContext;

/// Supplies "today" for each refresh.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Immutable result of one committed refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheSnapshot {
    /// Sorted by effective date.
    pub events: Vec<Event>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Per-source tallies of the refresh that produced `events`.
    pub tallies: Vec<SourceTally>,
}

impl CacheSnapshot {
    /// True until the first refresh commits.
    pub fn is_empty_state(&self) -> bool {
        self.last_updated.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was committed.
    Refreshed { events: usize },
    /// Another caller's refresh completed while this one waited.
    Joined,
    /// The pipeline did not run to completion; the previous snapshot stays.
    Failed { reason: String },
}

pub struct EventCache {
    coordinator: Arc<FetchCoordinator>,
    snapshot: Arc<RwLock<Arc<CacheSnapshot>>>,
    /// Held by the refresh task itself, so a dropped caller cannot release it.
    refresh_gate: Arc<Mutex<()>>,
    /// Completed refresh attempts.
    generation: Arc<AtomicU64>,
    clock: Clock,
}

impl EventCache {
    pub fn new(coordinator: FetchCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
            snapshot: Arc::new(RwLock::new(Arc::new(CacheSnapshot::default()))),
            refresh_gate: Arc::new(Mutex::new(())),
            generation: Arc::new(AtomicU64::new(0)),
            clock: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Cache over the production sources.
    pub fn from_config(config: &AggregatorConfig) -> Result<Self, SourceError> {
        Ok(Self::new(FetchCoordinator::from_config(config)?))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current snapshot. Does not wait for an in-flight refresh.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty_state(&self) -> bool {
        self.snapshot().is_empty_state()
    }

    /// Source descriptions in registration order.
    pub fn descriptions(&self) -> Vec<String> {
        self.coordinator.descriptions()
    }

    /// Per-source tallies of the last committed refresh.
    pub fn last_report(&self) -> Vec<SourceTally> {
        self.snapshot().tallies.clone()
    }

    /// Refresh only if nothing has been committed yet.
    pub async fn ensure_populated(&self) -> Option<RefreshOutcome> {
        if self.is_empty_state() {
            Some(self.refresh().await)
        } else {
            None
        }
    }

    /// Run a full refresh, or join the one already in flight.
    ///
    /// Once started, the refresh runs to completion and commits even if the
    /// caller stops waiting for it.
    pub async fn refresh(&self) -> RefreshOutcome {
        let observed = self.generation.load(Ordering::Acquire);
        let gate = self.refresh_gate.clone().lock_owned().await;
        if self.generation.load(Ordering::Acquire) != observed {
            debug!("joined in-flight refresh");
            return RefreshOutcome::Joined;
        }

        let coordinator = self.coordinator.clone();
        let clock = self.clock.clone();
        let snapshot = self.snapshot.clone();
        let generation = self.generation.clone();

        let refresh = tokio::spawn(async move {
            let _gate = gate;
            let outcome = run_pipeline(coordinator, clock, &snapshot).await;
            generation.fetch_add(1, Ordering::AcqRel);
            outcome
        });

        refresh.await.unwrap_or_else(|e| RefreshOutcome::Failed {
            reason: e.to_string(),
        })
    }
}

/// Coordinator → Merger, then commit. The pipeline itself runs in its own
/// task so a panic there leaves the current snapshot in place.
async fn run_pipeline(
    coordinator: Arc<FetchCoordinator>,
    clock: Clock,
    snapshot: &RwLock<Arc<CacheSnapshot>>,
) -> RefreshOutcome {
    info!("starting cache refresh");
    let pipeline = tokio::spawn(async move {
        let ctx = RefreshContext::new(clock());
        let report = coordinator.collect_all(ctx).await;
        (merge_events(report.events), report.tallies)
    });

    match pipeline.await {
        Ok((events, tallies)) => {
            let count = events.len();
            commit(
                snapshot,
                CacheSnapshot {
                    events,
                    last_updated: Some(Utc::now()),
                    tallies,
                },
            );
            info!(events = count, "cache refreshed");
            RefreshOutcome::Refreshed { events: count }
        }
        Err(e) => {
            error!(
                severity = "critical",
                error = %e,
                "cache refresh pipeline failed; keeping previous snapshot"
            );
            RefreshOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn commit(slot: &RwLock<Arc<CacheSnapshot>>, snapshot: CacheSnapshot) {
    let next = Arc::new(snapshot);
    *slot.write().unwrap_or_else(PoisonError::into_inner) = next;
}
