//! Normalized astronomical event shared by every source.

use serde::{Deserialize, Serialize};

/// Kind of phenomenon an [`Event`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Near-Earth object passing within the configured distance.
    CloseApproach,
    /// Solar eclipse.
    Eclipse,
    /// Meteor shower peak.
    MeteorShower,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CloseApproach => write!(f, "close_approach"),
            Self::Eclipse => write!(f, "eclipse"),
            Self::MeteorShower => write!(f, "meteor_shower"),
        }
    }
}

/// A single normalized event.
///
/// `date` is kept as upstream text (ISO-8601 where the adapter could
/// normalize it). It is never validated here; ordering code falls back to
/// [`crate::merge::effective_sort_date`] for anything unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub kind: EventKind,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_au: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity_km_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Upstream endpoint the event was fetched from.
    pub source: String,
}

impl Event {
    fn base(name: String, kind: EventKind, date: String, source: &str) -> Self {
        Self {
            name,
            kind,
            date,
            visibility: None,
            distance_au: None,
            velocity_km_s: None,
            coordinates: None,
            rate: None,
            source: source.to_string(),
        }
    }

    /// Close approach, visible globally.
    pub fn close_approach(
        name: impl Into<String>,
        date: impl Into<String>,
        distance_au: f64,
        velocity_km_s: f64,
        source: &str,
    ) -> Self {
        Self {
            visibility: Some("Global".to_string()),
            distance_au: Some(distance_au),
            velocity_km_s: Some(velocity_km_s),
            ..Self::base(name.into(), EventKind::CloseApproach, date.into(), source)
        }
    }

    /// Eclipse seen from `region`, with the optional ground-track path.
    pub fn eclipse(
        name: impl Into<String>,
        date: impl Into<String>,
        region: Option<String>,
        coordinates: Option<serde_json::Value>,
        source: &str,
    ) -> Self {
        Self {
            visibility: region,
            coordinates,
            ..Self::base(name.into(), EventKind::Eclipse, date.into(), source)
        }
    }

    /// Meteor shower peak, visible globally.
    pub fn meteor_shower(
        name: impl Into<String>,
        date: impl Into<String>,
        rate: Option<f64>,
        source: &str,
    ) -> Self {
        Self {
            visibility: Some("Global".to_string()),
            rate,
            ..Self::base(name.into(), EventKind::MeteorShower, date.into(), source)
        }
    }
}
