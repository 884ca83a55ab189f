use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::init_logging;
use storefront_harness::config::{load_config, ConfigSource, LoadedConfig};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let LoadedConfig { config, source } = load_config(cli.config.as_deref()).await?;
    let _log_guard = init_logging(&config.logging, cli.log_level.as_deref(), cli.debug)?;

    info!(
        "Starting storefront-harness v{} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_DATE")
    );
    // load_config ran before any subscriber was installed.
    match &source {
        ConfigSource::File(path) => info!("Loaded configuration from: {}", path.display()),
        ConfigSource::Defaults => warn!("Config file not found, using defaults"),
    }

    let cli_context = CliContext::new(config, source);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
