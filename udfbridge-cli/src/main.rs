//! udfbridge -- translate and validate detection rules from the command line

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use udfbridge_cli::cli::{Cli, Commands};
use udfbridge_cli::commands;
use udfbridge_cli::error::CliError;
use udfbridge_cli::output::OutputWriter;

/// Log level when neither `RUST_LOG` nor `--log-level` is given.
const DEFAULT_LOG_LEVEL: &str = "warn";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Translate(args) => commands::translate::execute(args, config_path, &writer).await,
        Commands::Validate(args) => commands::validate::execute(args, config_path, &writer).await,
        Commands::Batch(args) => commands::batch::execute(args, config_path, &writer).await,
        Commands::Platforms => commands::platforms::execute(config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}

/// Logs go to stderr so stdout stays clean for rendered output.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
