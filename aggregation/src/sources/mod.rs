//! Source adapters.
//!
//! Each adapter owns one upstream: it issues a single request, decodes the
//! body and normalizes every record into an [`Event`]. Transport and
//! top-level shape failures surface as [`SourceError`]; bad individual
//! records become [`SkippedRecord`]s and the rest of the batch survives.
//!
//! ```text
//! collect(ctx)
//!   ├─ fetch_events Ok(events)  → FetchOutcome::Fetched(events)
//!   └─ fetch_events Err(e)      → logged here → FetchOutcome::Failed { reason }
//! ```

pub mod approach;
pub mod eclipse;
pub mod meteor;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::event::Event;

pub use approach::ApproachSource;
pub use eclipse::EclipseSource;
pub use meteor::MeteorSource;

const USER_AGENT: &str = concat!("skywatch/", env!("CARGO_PKG_VERSION"));

/// Inputs that change between refreshes.
#[derive(Debug, Clone, Copy)]
pub struct RefreshContext {
    pub today: NaiveDate,
}

impl RefreshContext {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Context for the current UTC day.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().date_naive())
    }
}

/// Result of one adapter run. Never carries an error out of the adapter.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(Vec<Event>),
    Failed { reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }

    pub fn event_count(&self) -> usize {
        match self {
            Self::Fetched(events) => events.len(),
            Self::Failed { .. } => 0,
        }
    }

    /// Events on success, empty on failure.
    pub fn into_events(self) -> Vec<Event> {
        match self {
            Self::Fetched(events) => events,
            Self::Failed { .. } => Vec::new(),
        }
    }
}

/// A record dropped during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Zero-based position in the upstream array.
    pub index: usize,
    /// Record name, when it had one.
    pub name: Option<String>,
    pub reason: String,
}

/// Normalization output for one upstream body.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub events: Vec<Event>,
    pub skipped: Vec<SkippedRecord>,
}

impl Normalized {
    pub(crate) fn skip(&mut self, index: usize, name: Option<&str>, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            index,
            name: name.map(str::to_string),
            reason: reason.into(),
        });
    }

    /// Log every skipped record for `source` and hand back the events.
    pub(crate) fn into_logged_events(self, source: &str) -> Vec<Event> {
        for skip in &self.skipped {
            warn!(
                source,
                index = skip.index,
                name = skip.name.as_deref().unwrap_or("<unnamed>"),
                reason = %skip.reason,
                "skipping malformed record"
            );
        }
        self.events
    }
}

/// One upstream data source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs and tallies.
    fn name(&self) -> &str;

    /// Human-readable description listed by the API.
    fn description(&self) -> &str;

    /// Fetch and normalize. Errors mean the whole source produced nothing.
    async fn fetch_events(&self, ctx: &RefreshContext) -> Result<Vec<Event>, SourceError>;

    /// Run [`Self::fetch_events`], logging any failure at the adapter
    /// boundary.
    async fn collect(&self, ctx: &RefreshContext) -> FetchOutcome {
        match self.fetch_events(ctx).await {
            Ok(events) => FetchOutcome::Fetched(events),
            Err(e) => {
                error!(
                    source = self.name(),
                    category = %e.category(),
                    error = %e,
                    "source fetch failed"
                );
                FetchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// TLS policy for an upstream client.
#[derive(Debug, Clone, Default)]
pub(crate) struct TlsOptions {
    pub ca_cert_pem: Option<Vec<u8>>,
    pub accept_invalid_certs: bool,
}

pub(crate) fn build_client(
    timeout: Duration,
    tls: TlsOptions,
) -> Result<reqwest::Client, SourceError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT);

    if let Some(pem) = tls.ca_cert_pem {
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| SourceError::Client(format!("invalid CA bundle: {e}")))?;
        builder = builder.add_root_certificate(cert);
    }
    if tls.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| SourceError::Client(e.to_string()))
}

/// Single GET returning the decoded JSON body. Non-2xx is an error.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value, SourceError> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(url, e))?
        .error_for_status()
        .map_err(|e| SourceError::from_reqwest(url, e))?;

    response
        .json::<Value>()
        .await
        .map_err(|e| SourceError::from_reqwest(url, e))
}

/// Number or numeric string. Non-finite values count as unparseable.
pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Non-empty string field.
pub(crate) fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The three production sources in registration order.
pub fn default_sources(
    config: &AggregatorConfig,
) -> Result<Vec<Arc<dyn SourceAdapter>>, SourceError> {
    Ok(vec![
        Arc::new(ApproachSource::new(config)?),
        Arc::new(EclipseSource::new(config)?),
        Arc::new(MeteorSource::new(config)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Broken;

    #[async_trait]
    impl SourceAdapter for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn fetch_events(&self, _ctx: &RefreshContext) -> Result<Vec<Event>, SourceError> {
            Err(SourceError::Timeout {
                url: "http://upstream".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_collect_absorbs_failure() {
        let ctx = RefreshContext::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let outcome = Broken.collect(&ctx).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.event_count(), 0);
        match &outcome {
            FetchOutcome::Failed { reason } => assert!(reason.contains("timed out")),
            FetchOutcome::Fetched(_) => panic!("expected failure"),
        }
        assert!(outcome.into_events().is_empty());
    }

    #[test]
    fn test_parse_number_accepts_strings_and_numbers() {
        assert_eq!(parse_number(&json!("0.0123")), Some(0.0123));
        assert_eq!(parse_number(&json!(" 7.5 ")), Some(7.5));
        assert_eq!(parse_number(&json!(120)), Some(120.0));
        assert_eq!(parse_number(&json!("fast")), None);
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!(null)), None);
    }

    #[test]
    fn test_string_field_ignores_blank() {
        let record = json!({ "name": "  ", "type": "Total" });
        assert_eq!(string_field(&record, "name"), None);
        assert_eq!(string_field(&record, "type"), Some("Total"));
        assert_eq!(string_field(&record, "missing"), None);
    }

    #[test]
    fn test_bad_ca_bundle_is_client_error() {
        let tls = TlsOptions {
            ca_cert_pem: Some(b"not a certificate".to_vec()),
            accept_invalid_certs: false,
        };
        let err = build_client(Duration::from_secs(1), tls).unwrap_err();
        assert!(matches!(err, SourceError::Client(_)));
    }
}
