//! Error taxonomy for source fetches and configuration.
//!
//! Per-field parse problems are not errors at this level: adapters turn them
//! into [`crate::sources::SkippedRecord`]s and keep going. A [`SourceError`]
//! always means the whole fetch for one source produced nothing.
//!
//! | Variant       | Category      |
//! |---------------|---------------|
//! | Transport     | transport     |
//! | Timeout       | transport     |
//! | HttpStatus    | transport     |
//! | Schema        | schema        |
//! | Client        | configuration |

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used in logs and the per-source tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network unreachable, timeout, non-2xx.
    Transport,
    /// Body did not have the expected JSON shape.
    Schema,
    /// Local setup problem (bad CA bundle, client build failure).
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Schema => write!(f, "schema"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Failure of a single source fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("upstream {url} answered HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("unexpected response shape from {url}: {message}")]
    Schema { url: String, message: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl SourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::HttpStatus { .. } => {
                ErrorCategory::Transport
            }
            Self::Schema { .. } => ErrorCategory::Schema,
            Self::Client(_) => ErrorCategory::Configuration,
        }
    }

    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Schema {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn schema(url: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
