//! International Meteor Organization calendar adapter.
//!
//! The calendar lists peak dates as `YYYY-Mon-DD` (`2025-Apr-22`). Each
//! record is parsed on its own: a missing name or an unparseable peak drops
//! that shower only.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    build_client, get_json, parse_number, string_field, Normalized, RefreshContext,
    SourceAdapter, TlsOptions,
};
use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::event::Event;

const PEAK_FORMAT: &str = "%Y-%b-%d";

pub struct MeteorSource {
    client: reqwest::Client,
    url: String,
}

impl MeteorSource {
    pub fn new(config: &AggregatorConfig) -> Result<Self, SourceError> {
        let ca_cert_pem = match &config.meteor_ca_cert {
            Some(path) => Some(std::fs::read(path).map_err(|e| {
                SourceError::Client(format!("cannot read CA bundle {}: {e}", path.display()))
            })?),
            None => None,
        };
        if config.meteor_insecure_tls {
            warn!(
                url = %config.meteor_url(),
                "TLS certificate validation disabled for the meteor calendar (meteor_insecure_tls)"
            );
        }

        let tls = TlsOptions {
            ca_cert_pem,
            accept_invalid_certs: config.meteor_insecure_tls,
        };
        Ok(Self {
            client: build_client(config.request_timeout(), tls)?,
            url: config.meteor_url(),
        })
    }
}

#[async_trait]
impl SourceAdapter for MeteorSource {
    fn name(&self) -> &str {
        "meteors"
    }

    fn description(&self) -> &str {
        "International Meteor Organization"
    }

    async fn fetch_events(&self, _ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
        let body = get_json(&self.client, &self.url, &[]).await?;
        let normalized = normalize_meteors(&body, &self.url)?;
        debug!(
            source = self.name(),
            events = normalized.events.len(),
            skipped = normalized.skipped.len(),
            "normalized meteor showers"
        );
        Ok(normalized.into_logged_events(self.name()))
    }
}

/// Parse an IMO peak date into ISO date-time text (`2025-04-22T00:00:00`).
pub fn parse_peak(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), PEAK_FORMAT)
        .ok()
        .map(|d| format!("{}T00:00:00", d.format("%Y-%m-%d")))
}

/// Map the calendar array into meteor shower events.
pub fn normalize_meteors(body: &Value, source_url: &str) -> Result<Normalized, SourceError> {
    let records = body
        .as_array()
        .ok_or_else(|| SourceError::schema(source_url, "expected a JSON array"))?;

    let mut out = Normalized::default();
    for (index, record) in records.iter().enumerate() {
        let Some(name) = string_field(record, "name") else {
            out.skip(index, None, "missing shower name");
            continue;
        };
        let Some(peak) = record.get("peak").and_then(Value::as_str) else {
            out.skip(index, Some(name), "missing peak date");
            continue;
        };
        let Some(date) = parse_peak(peak) else {
            out.skip(index, Some(name), format!("unparseable peak date {peak:?}"));
            continue;
        };

        let rate = match record.get("zhr") {
            None | Some(Value::Null) => None,
            Some(zhr) => {
                let parsed = parse_number(zhr);
                if parsed.is_none() {
                    warn!(index, name, zhr = %zhr, "dropping unparseable ZHR");
                }
                parsed
            }
        };

        out.events.push(Event::meteor_shower(name, date, rate, source_url));
    }
    Ok(out)
}
