use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use skywatch_aggregation::{AggregatorConfig, ConfigError};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Parser)]
#[command(name = "skywatch", version, about = "Astronomical event aggregator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default if no subcommand given).
    Serve {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// TOML config file. Without it, SKYWATCH_* env vars and defaults apply.
        #[arg(long, env = "SKYWATCH_CONFIG")]
        config: Option<PathBuf>,

        /// Emit logs as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Run one refresh and print the resulting snapshot as JSON.
    Fetch {
        #[arg(long, env = "SKYWATCH_CONFIG")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// `serve` with every flag at its default.
    pub fn default_serve() -> Self {
        Self::Serve {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            config: None,
            json: false,
        }
    }

    pub fn json_logs(&self) -> bool {
        matches!(self, Self::Serve { json: true, .. })
    }
}

/// Config from `path` when given, else from the environment. Always validated.
pub fn load_config(path: Option<&Path>) -> Result<AggregatorConfig, ConfigError> {
    let config = match path {
        Some(path) => AggregatorConfig::from_toml_file(path)?,
        None => AggregatorConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
