//! Solar eclipse calendar adapter.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{
    build_client, get_json, string_field, Normalized, RefreshContext, SourceAdapter, TlsOptions,
};
use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::event::Event;

pub struct EclipseSource {
    client: reqwest::Client,
    url: String,
    year: i32,
}

impl EclipseSource {
    pub fn new(config: &AggregatorConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(config.request_timeout(), TlsOptions::default())?,
            url: config.eclipse_url.clone(),
            year: config.catalog_year,
        })
    }
}

#[async_trait]
impl SourceAdapter for EclipseSource {
    fn name(&self) -> &str {
        "eclipses"
    }

    fn description(&self) -> &str {
        "NASA Eclipse API"
    }

    async fn fetch_events(&self, _ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
        let query = [("year", self.year.to_string()), ("type", "solar".to_string())];
        let body = get_json(&self.client, &self.url, &query).await?;
        let normalized = normalize_eclipses(&body, &self.url)?;
        debug!(
            source = self.name(),
            events = normalized.events.len(),
            skipped = normalized.skipped.len(),
            "normalized eclipses"
        );
        Ok(normalized.into_logged_events(self.name()))
    }
}

/// Map `{ "eclipses": [...] }` into eclipse events named `"<type> Eclipse"`.
///
/// `region` becomes the visibility and `path_coordinates` is passed through
/// as-is. Records without a type or date are skipped.
pub fn normalize_eclipses(body: &Value, source_url: &str) -> Result<Normalized, SourceError> {
    let object = body
        .as_object()
        .ok_or_else(|| SourceError::schema(source_url, "expected a JSON object"))?;

    let records = match object.get("eclipses") {
        None | Some(Value::Null) => return Ok(Normalized::default()),
        Some(Value::Array(records)) => records,
        Some(_) => return Err(SourceError::schema(source_url, "`eclipses` is not an array")),
    };

    let mut out = Normalized::default();
    for (index, record) in records.iter().enumerate() {
        if !record.is_object() {
            out.skip(index, None, "record is not an object");
            continue;
        }
        let Some(kind) = string_field(record, "type") else {
            out.skip(index, None, "missing eclipse type");
            continue;
        };
        let name = format!("{kind} Eclipse");
        let Some(date) = string_field(record, "date") else {
            out.skip(index, Some(&name), "missing eclipse date");
            continue;
        };
        let region = string_field(record, "region").map(str::to_string);
        let coordinates = record
            .get("path_coordinates")
            .filter(|v| !v.is_null())
            .cloned();

        out.events.push(Event::eclipse(name, date, region, coordinates, source_url));
    }
    Ok(out)
}
