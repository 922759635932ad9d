//! Integration tests for the refresh pipeline
//!
//! Fake sources stand in for the upstreams so every property of the
//! coordinator → merge → cache flow can be checked without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use skywatch_aggregation::{
    Event, EventCache, EventKind, FetchCoordinator, RefreshContext, RefreshOutcome,
    SourceAdapter, SourceError, SourceStatus,
};

/// Source returning a fixed batch, or failing like a dead upstream.
struct StaticSource {
    name: &'static str,
    events: Option<Vec<Event>>,
}

impl StaticSource {
    fn ok(name: &'static str, events: Vec<Event>) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name,
            events: Some(events),
        })
    }

    fn down(name: &'static str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self { name, events: None })
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.name
    }

    async fn fetch_events(&self, _ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
        match &self.events {
            Some(events) => Ok(events.clone()),
            None => Err(SourceError::Transport {
                url: format!("https://{}.invalid", self.name),
                message: "connection refused".into(),
            }),
        }
    }
}

fn approach(name: &str, date: &str) -> Event {
    Event::close_approach(name, date, 0.05, 10.0, "cad")
}

fn eclipse(name: &str, date: &str) -> Event {
    Event::eclipse(name, date, Some("Europe".into()), None, "eclipse")
}

fn shower(name: &str, date: &str) -> Event {
    Event::meteor_shower(name, date, Some(20.0), "imo")
}

fn names(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.name.as_str()).collect()
}

fn fixed_today() -> Arc<dyn Fn() -> NaiveDate + Send + Sync> {
    Arc::new(|| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
}

/// Test: a dead eclipse upstream leaves the other two sources intact
#[tokio::test]
async fn test_eclipse_outage_keeps_other_sources() {
    let coordinator = FetchCoordinator::with_default_workers(vec![
        StaticSource::ok("approaches", vec![approach("(2024 YR4)", "2025-02-11T23:40:00")]),
        StaticSource::down("eclipses"),
        StaticSource::ok("meteors", vec![shower("Lyrids", "2025-04-22T00:00:00")]),
    ]);
    let cache = EventCache::new(coordinator).with_clock(fixed_today());

    let outcome = cache.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Refreshed { events: 2 });

    let snapshot = cache.snapshot();
    let kinds: Vec<_> = snapshot.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::CloseApproach, EventKind::MeteorShower]);
    assert!(matches!(
        snapshot.tallies[1].status,
        SourceStatus::Failed { .. }
    ));
}

/// Test: identical effective dates keep the order the sources produced
#[tokio::test]
async fn test_equal_dates_are_stable_across_sources() {
    let coordinator = FetchCoordinator::with_default_workers(vec![
        StaticSource::ok("approaches", vec![approach("A", "2025-06-01T03:00:00")]),
        StaticSource::ok("eclipses", vec![eclipse("B", "2025-06-01")]),
        StaticSource::ok("meteors", vec![shower("C", "2025-06-01T00:00:00")]),
    ]);
    let cache = EventCache::new(coordinator).with_clock(fixed_today());
    cache.refresh().await;

    assert_eq!(names(&cache.snapshot().events), vec!["A", "B", "C"]);
}

/// Test: an unparseable date lands after every valid date, whatever its source
#[tokio::test]
async fn test_malformed_date_sorts_last() {
    let coordinator = FetchCoordinator::with_default_workers(vec![
        StaticSource::ok(
            "approaches",
            vec![approach("broken", "not-a-date"), approach("early", "2025-01-10")],
        ),
        StaticSource::ok("eclipses", vec![eclipse("late", "2025-12-31")]),
        StaticSource::ok("meteors", vec![shower("mid", "2025-08-12T00:00:00")]),
    ]);
    let cache = EventCache::new(coordinator).with_clock(fixed_today());
    cache.refresh().await;

    assert_eq!(
        names(&cache.snapshot().events),
        vec!["early", "mid", "late", "broken"]
    );
}

/// Test: all sources empty still commits a snapshot
#[tokio::test]
async fn test_all_empty_refresh_still_populates() {
    let coordinator = FetchCoordinator::with_default_workers(vec![
        StaticSource::down("approaches"),
        StaticSource::down("eclipses"),
        StaticSource::ok("meteors", Vec::new()),
    ]);
    let cache = EventCache::new(coordinator).with_clock(fixed_today());

    assert_eq!(
        cache.ensure_populated().await,
        Some(RefreshOutcome::Refreshed { events: 0 })
    );
    let snapshot = cache.snapshot();
    assert!(snapshot.last_updated.is_some());
    assert!(snapshot.events.is_empty());
    assert!(cache.ensure_populated().await.is_none());
}

/// Source whose every event carries the refresh number it came from.
struct GenerationSource {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for GenerationSource {
    fn name(&self) -> &str {
        "generations"
    }

    fn description(&self) -> &str {
        "Generation source"
    }

    async fn fetch_events(&self, _ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
        let generation = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok((0..generation)
            .map(|i| shower(&format!("gen-{generation}-{i}"), "2025-06-01"))
            .collect())
    }
}

/// Test: readers racing refreshes never see events and metadata from different refreshes
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshot_is_never_mixed() {
    let source: Arc<dyn SourceAdapter> = Arc::new(GenerationSource {
        calls: AtomicUsize::new(0),
    });
    let cache = Arc::new(
        EventCache::new(FetchCoordinator::with_default_workers(vec![source]))
            .with_clock(fixed_today()),
    );

    let writer = {
        let cache = cache.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                cache.refresh().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let snapshot = cache.snapshot();
                if snapshot.is_empty_state() {
                    assert!(snapshot.events.is_empty());
                    assert!(snapshot.tallies.is_empty());
                } else {
                    // Generation g yields exactly g events, all tagged gen-g.
                    let generation = snapshot.events.len();
                    let prefix = format!("gen-{generation}-");
                    assert!(snapshot.events.iter().all(|e| e.name.starts_with(&prefix)));
                    assert_eq!(snapshot.tallies[0].events, generation);
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(cache.snapshot().events.len(), 20);
}
