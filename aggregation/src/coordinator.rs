//! Fetch coordinator: concurrent fan-out over every source.
//!
//! ```text
//! collect_all(ctx)
//!   JoinSet::spawn(source_i.collect(ctx)) × N    (Semaphore: max_workers)
//!   join_next_with_id → per-source tally
//!   concatenate events in registration order
//! ```
//!
//! ## Failure policy
//!
//! Adapters already absorb their own errors. A worker task that dies anyway
//! (panic, cancellation) is logged with its source name and counted as zero
//! events; the remaining sources are still collected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::event::Event;
use crate::sources::{default_sources, FetchOutcome, RefreshContext, SourceAdapter};

/// How a source fared in one collection round.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    /// The adapter reported a failure and contributed nothing.
    Failed { reason: String },
    /// The worker task itself died.
    Crashed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceTally {
    pub source: String,
    pub description: String,
    pub events: usize,
    pub status: SourceStatus,
}

/// Output of one collection round.
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub events: Vec<Event>,
    /// One entry per source, in registration order.
    pub tallies: Vec<SourceTally>,
}

impl CollectionReport {
    pub fn failed_sources(&self) -> usize {
        self.tallies
            .iter()
            .filter(|t| t.status != SourceStatus::Ok)
            .count()
    }
}

/// Runs every registered source concurrently.
pub struct FetchCoordinator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    max_workers: usize,
}

impl FetchCoordinator {
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>, max_workers: usize) -> Self {
        Self {
            sources,
            max_workers: max_workers.max(1),
        }
    }

    /// One worker per source.
    pub fn with_default_workers(sources: Vec<Arc<dyn SourceAdapter>>) -> Self {
        let workers = sources.len();
        Self::new(sources, workers)
    }

    /// The production sources built from `config`.
    pub fn from_config(config: &AggregatorConfig) -> Result<Self, SourceError> {
        Ok(Self::new(default_sources(config)?, config.max_workers))
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn sources(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.sources
    }

    /// Source descriptions in registration order.
    pub fn descriptions(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.description().to_string())
            .collect()
    }

    pub async fn collect_all(&self, ctx: RefreshContext) -> CollectionReport {
        let start = Instant::now();
        let sem = Arc::new(Semaphore::new(self.max_workers));
        let mut join_set: JoinSet<FetchOutcome> = JoinSet::new();
        let mut slots: HashMap<tokio::task::Id, usize> = HashMap::new();

        for (slot, source) in self.sources.iter().enumerate() {
            let sem = sem.clone();
            let source = source.clone();
            let handle = join_set.spawn(async move {
                let _permit = sem.acquire().await.ok();
                source.collect(&ctx).await
            });
            slots.insert(handle.id(), slot);
        }

        let mut collected: Vec<Option<(Vec<Event>, SourceStatus)>> =
            (0..self.sources.len()).map(|_| None).collect();

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let Some(&slot) = slots.get(&id) else {
                        continue;
                    };
                    let name = self.sources[slot].name();
                    let entry = match outcome {
                        FetchOutcome::Fetched(events) => {
                            info!(source = name, events = events.len(), "source collected");
                            (events, SourceStatus::Ok)
                        }
                        FetchOutcome::Failed { reason } => {
                            info!(source = name, events = 0, "source collected nothing");
                            (Vec::new(), SourceStatus::Failed { reason })
                        }
                    };
                    collected[slot] = Some(entry);
                }
                Err(e) => {
                    let Some(&slot) = slots.get(&e.id()) else {
                        error!(error = %e, "unknown source worker failed");
                        continue;
                    };
                    let name = self.sources[slot].name();
                    error!(source = name, events = 0, error = %e, "source worker failed");
                    collected[slot] = Some((
                        Vec::new(),
                        SourceStatus::Crashed {
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }

        let mut report = CollectionReport::default();
        for (source, entry) in self.sources.iter().zip(collected) {
            let (events, status) = entry.unwrap_or_else(|| {
                (
                    Vec::new(),
                    SourceStatus::Crashed {
                        reason: "worker never reported".to_string(),
                    },
                )
            });
            report.tallies.push(SourceTally {
                source: source.name().to_string(),
                description: source.description().to_string(),
                events: events.len(),
                status,
            });
            report.events.extend(events);
        }

        info!(
            sources = self.sources.len(),
            events = report.events.len(),
            failed = report.failed_sources(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "collection round complete"
        );
        report
    }
}
