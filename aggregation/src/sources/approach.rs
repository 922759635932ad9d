//! NASA/JPL close-approach adapter.
//!
//! The CAD API answers `{ "count": "n", "fields": [...], "data": [[...]] }`
//! with positional rows. Only four positions matter here:
//!
//! | index | field                  |
//! |-------|------------------------|
//! | 0     | designation (`des`)    |
//! | 3     | close-approach date    |
//! | 4     | distance (AU)          |
//! | 7     | relative velocity km/s |

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::debug;

use super::{
    build_client, get_json, parse_number, Normalized, RefreshContext, SourceAdapter, TlsOptions,
};
use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::event::Event;

const IDX_DESIGNATION: usize = 0;
const IDX_DATE: usize = 3;
const IDX_DISTANCE: usize = 4;
const IDX_VELOCITY: usize = 7;

/// CAD date form, e.g. `2025-Jan-04 08:16`.
const CAD_DATE_FORMAT: &str = "%Y-%b-%d %H:%M";

pub struct ApproachSource {
    client: reqwest::Client,
    url: String,
    date_max: String,
    dist_max: f64,
}

impl ApproachSource {
    pub fn new(config: &AggregatorConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(config.request_timeout(), TlsOptions::default())?,
            url: config.approach_url.clone(),
            date_max: config.date_max(),
            dist_max: config.approach_dist_max,
        })
    }

    fn query(&self, ctx: &RefreshContext) -> Vec<(&'static str, String)> {
        vec![
            ("date-min", ctx.today.format("%Y-%m-%d").to_string()),
            ("date-max", self.date_max.clone()),
            ("dist-max", self.dist_max.to_string()),
            ("fullname", "true".to_string()),
        ]
    }
}

#[async_trait]
impl SourceAdapter for ApproachSource {
    fn name(&self) -> &str {
        "approaches"
    }

    fn description(&self) -> &str {
        "NASA Close Approach Data API"
    }

    async fn fetch_events(&self, ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
        let body = get_json(&self.client, &self.url, &self.query(ctx)).await?;
        let normalized = normalize_approaches(&body, &self.url)?;
        debug!(
            source = self.name(),
            events = normalized.events.len(),
            skipped = normalized.skipped.len(),
            "normalized close approaches"
        );
        Ok(normalized.into_logged_events(self.name()))
    }
}

/// Convert a CAD date to ISO-8601, passing anything else through untouched.
pub fn normalize_cad_date(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw.trim(), CAD_DATE_FORMAT) {
        Ok(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

fn text_at(row: &[Value], idx: usize) -> Option<String> {
    match row.get(idx)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map a CAD body into close-approach events.
///
/// A body without `data` has no approaches in the window. A row that is not
/// an array, lacks a designation or date, or has an unparseable distance or
/// velocity is skipped.
pub fn normalize_approaches(body: &Value, source_url: &str) -> Result<Normalized, SourceError> {
    let object = body
        .as_object()
        .ok_or_else(|| SourceError::schema(source_url, "expected a JSON object"))?;

    let rows = match object.get("data") {
        None | Some(Value::Null) => return Ok(Normalized::default()),
        Some(Value::Array(rows)) => rows,
        Some(_) => return Err(SourceError::schema(source_url, "`data` is not an array")),
    };

    let mut out = Normalized::default();
    for (index, row) in rows.iter().enumerate() {
        let Some(row) = row.as_array() else {
            out.skip(index, None, "row is not an array");
            continue;
        };
        let Some(name) = text_at(row, IDX_DESIGNATION) else {
            out.skip(index, None, "missing designation");
            continue;
        };
        let Some(date) = text_at(row, IDX_DATE) else {
            out.skip(index, Some(&name), "missing close-approach date");
            continue;
        };
        let Some(distance) = row.get(IDX_DISTANCE).and_then(parse_number) else {
            out.skip(index, Some(&name), "unparseable distance");
            continue;
        };
        let Some(velocity) = row.get(IDX_VELOCITY).and_then(parse_number) else {
            out.skip(index, Some(&name), "unparseable velocity");
            continue;
        };

        out.events.push(Event::close_approach(
            name,
            normalize_cad_date(&date),
            distance,
            velocity,
            source_url,
        ));
    }
    Ok(out)
}
