use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use skywatch_aggregation::{AggregatorConfig, EventCache, RefreshOutcome};
use skywatch_api::cli::{load_config, Cli, Commands};
use skywatch_api::{serve, telemetry, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or_else(Commands::default_serve);
    telemetry::init(cmd.json_logs());

    match cmd {
        Commands::Serve {
            host,
            port,
            config,
            json: _,
        } => {
            let config = load_config(config.as_deref()).context("loading configuration")?;
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid listen address {host}:{port}"))?;
            let cache = build_cache(&config)?;

            match cache.refresh().await {
                RefreshOutcome::Failed { reason } => error!(
                    severity = "critical",
                    %reason,
                    "initial cache refresh failed; starting with an empty cache"
                ),
                outcome => info!(?outcome, "initial cache refresh complete"),
            }

            serve(addr, AppState::new(cache)).await?;
        }
        Commands::Fetch { config } => {
            let config = load_config(config.as_deref()).context("loading configuration")?;
            let cache = build_cache(&config)?;
            cache.refresh().await;
            println!("{}", serde_json::to_string_pretty(&*cache.snapshot())?);
        }
    }

    Ok(())
}

fn build_cache(config: &AggregatorConfig) -> Result<Arc<EventCache>> {
    info!(
        approaches = %config.approach_url,
        eclipses = %config.eclipse_url,
        meteors = %config.meteor_url(),
        year = config.catalog_year,
        workers = config.max_workers,
        "skywatch starting"
    );
    let cache = EventCache::from_config(config).context("building source adapters")?;
    Ok(Arc::new(cache))
}
