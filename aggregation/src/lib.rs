//! Skywatch aggregation library
//!
//! Collects astronomical events from independent upstream sources and keeps
//! one merged, date-ordered snapshot in memory:
//!
//! ```text
//! sources (approaches, eclipses, meteors)
//!   └─ FetchCoordinator   concurrent fan-out, per-source isolation
//!       └─ merge_events   stable sort by effective date
//!           └─ EventCache atomic snapshot swap, single-flight refresh
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use skywatch_aggregation::{AggregatorConfig, EventCache};
//!
//! let cache = EventCache::from_config(&AggregatorConfig::default())?;
//! cache.refresh().await;
//! let snapshot = cache.snapshot();
//! println!("{} events", snapshot.events.len());
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod merge;
pub mod sources;

pub use cache::{CacheSnapshot, Clock, EventCache, RefreshOutcome};
pub use config::AggregatorConfig;
pub use coordinator::{CollectionReport, FetchCoordinator, SourceStatus, SourceTally};
pub use error::{ConfigError, ErrorCategory, SourceError};
pub use event::{Event, EventKind};
pub use merge::{effective_sort_date, merge_events};
pub use sources::{
    default_sources, ApproachSource, EclipseSource, FetchOutcome, MeteorSource, Normalized,
    RefreshContext, SkippedRecord, SourceAdapter,
};
