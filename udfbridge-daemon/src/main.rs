use anyhow::Result;
use clap::Parser;

use udfbridge_core::UdfBridgeConfig;
use udfbridge_daemon::cli::DaemonCli;
use udfbridge_daemon::daemon::Daemon;
use udfbridge_daemon::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // File, then UDFBRIDGE_* environment, then command-line flags
    let mut config = UdfBridgeConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;

    if cli.validate {
        tracing::info!(path = %cli.config.display(), "configuration is valid");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "udfbridged starting"
    );

    let daemon = Daemon::build_from_config(config)?;
    daemon.run().await?;

    tracing::info!("udfbridged shut down");
    Ok(())
}
