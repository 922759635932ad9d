//! Aggregator configuration.
//!
//! Values resolve in three layers: built-in defaults, then `SKYWATCH_*`
//! environment variables, then (when loaded from a file) TOML keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_APPROACH_URL: &str = "https://ssd-api.jpl.nasa.gov/cad.api";
pub const DEFAULT_ECLIPSE_URL: &str = "https://ssd-api.jpl.nasa.gov/eclipse.api";
pub const DEFAULT_METEOR_BASE_URL: &str = "https://data.imo.net/members/imo_v3/calendar";
pub const DEFAULT_CATALOG_YEAR: i32 = 2025;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Static configuration shared by the adapters and the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// NASA/JPL close-approach endpoint.
    pub approach_url: String,
    /// Eclipse calendar endpoint.
    pub eclipse_url: String,
    /// IMO calendar root; the year is appended as a path segment.
    pub meteor_base_url: String,
    /// Year requested from the eclipse and meteor calendars.
    pub catalog_year: i32,
    /// Upper bound of the close-approach window (`YYYY-MM-DD`).
    /// Defaults to December 31st of `catalog_year`.
    pub approach_date_max: Option<String>,
    /// Maximum approach distance in AU.
    pub approach_dist_max: f64,
    pub request_timeout_secs: u64,
    /// Concurrent adapter fetches per refresh.
    pub max_workers: usize,
    /// Extra PEM CA bundle trusted for the meteor calendar.
    pub meteor_ca_cert: Option<PathBuf>,
    /// Disable TLS certificate validation toward the meteor calendar.
    /// Off unless explicitly opted in.
    pub meteor_insecure_tls: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            approach_url: env_string("SKYWATCH_APPROACH_URL", DEFAULT_APPROACH_URL),
            eclipse_url: env_string("SKYWATCH_ECLIPSE_URL", DEFAULT_ECLIPSE_URL),
            meteor_base_url: env_string("SKYWATCH_METEOR_URL", DEFAULT_METEOR_BASE_URL),
            catalog_year: env_parse("SKYWATCH_CATALOG_YEAR", DEFAULT_CATALOG_YEAR),
            approach_date_max: std::env::var("SKYWATCH_APPROACH_DATE_MAX").ok(),
            approach_dist_max: env_parse("SKYWATCH_APPROACH_DIST_MAX", 0.1),
            request_timeout_secs: env_parse("SKYWATCH_REQUEST_TIMEOUT_SECS", 15),
            max_workers: env_parse("SKYWATCH_MAX_WORKERS", 3),
            meteor_ca_cert: std::env::var("SKYWATCH_METEOR_CA_CERT")
                .ok()
                .map(PathBuf::from),
            meteor_insecure_tls: env_flag("SKYWATCH_METEOR_INSECURE_TLS"),
        }
    }
}

impl AggregatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file. Keys missing from the file keep their
    /// environment/default values.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_approach_url(mut self, url: impl Into<String>) -> Self {
        self.approach_url = url.into();
        self
    }

    pub fn with_eclipse_url(mut self, url: impl Into<String>) -> Self {
        self.eclipse_url = url.into();
        self
    }

    pub fn with_meteor_base_url(mut self, url: impl Into<String>) -> Self {
        self.meteor_base_url = url.into();
        self
    }

    pub fn with_catalog_year(mut self, year: i32) -> Self {
        self.catalog_year = year;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Close-approach `date-max` query value.
    pub fn date_max(&self) -> String {
        self.approach_date_max
            .clone()
            .unwrap_or_else(|| format!("{}-12-31", self.catalog_year))
    }

    /// Full meteor calendar URL for `catalog_year`.
    pub fn meteor_url(&self) -> String {
        format!(
            "{}/{}/",
            self.meteor_base_url.trim_end_matches('/'),
            self.catalog_year
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("approach_url", &self.approach_url),
            ("eclipse_url", &self.eclipse_url),
            ("meteor_base_url", &self.meteor_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    message: "must not be empty".into(),
                });
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                message: "must be at least 1".into(),
            });
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid {
                key: "max_workers",
                message: "must be at least 1".into(),
            });
        }
        if !(self.approach_dist_max.is_finite() && self.approach_dist_max > 0.0) {
            return Err(ConfigError::Invalid {
                key: "approach_dist_max",
                message: format!("{} is not a positive distance", self.approach_dist_max),
            });
        }
        let date_max = self.date_max();
        if NaiveDate::parse_from_str(&date_max, "%Y-%m-%d").is_err() {
            return Err(ConfigError::Invalid {
                key: "approach_date_max",
                message: format!("{date_max:?} is not a YYYY-MM-DD date"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_date_max_follows_catalog_year() {
        let mut config = AggregatorConfig::new().with_catalog_year(2027);
        config.approach_date_max = None;
        assert_eq!(config.date_max(), "2027-12-31");

        config.approach_date_max = Some("2027-06-30".into());
        assert_eq!(config.date_max(), "2027-06-30");
    }

    #[test]
    fn test_meteor_url_appends_year_once() {
        let config = AggregatorConfig::new()
            .with_meteor_base_url("https://data.imo.net/members/imo_v3/calendar/")
            .with_catalog_year(2025);
        assert_eq!(
            config.meteor_url(),
            "https://data.imo.net/members/imo_v3/calendar/2025/"
        );
    }

    #[test]
    fn test_validate_rejects_zero_workers_and_timeout() {
        let config = AggregatorConfig::new().with_max_workers(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "max_workers",
                ..
            })
        ));

        let config = AggregatorConfig::new()
            .with_max_workers(3)
            .with_request_timeout_secs(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_date_max() {
        let mut config = AggregatorConfig::new()
            .with_max_workers(3)
            .with_request_timeout_secs(5);
        config.approach_dist_max = 0.1;
        config.approach_date_max = Some("end of year".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_file_overrides_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
approach_url = "http://127.0.0.1:9000/cad.api"
catalog_year = 2026
approach_dist_max = 0.05
request_timeout_secs = 4
max_workers = 2
meteor_insecure_tls = true
"#
        )
        .unwrap();

        let config = AggregatorConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.approach_url, "http://127.0.0.1:9000/cad.api");
        assert_eq!(config.catalog_year, 2026);
        assert_eq!(config.approach_dist_max, 0.05);
        assert_eq!(config.request_timeout(), Duration::from_secs(4));
        assert_eq!(config.max_workers, 2);
        assert!(config.meteor_insecure_tls);
    }

    #[test]
    fn test_from_toml_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_workers = \"three\"").unwrap();

        let err = AggregatorConfig::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err =
            AggregatorConfig::from_toml_file(Path::new("/nonexistent/skywatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
