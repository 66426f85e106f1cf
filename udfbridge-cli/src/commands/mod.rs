//! Command handlers -- one module per subcommand

pub mod batch;
pub mod config;
pub mod platforms;
pub mod translate;
pub mod validate;

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;

use udfbridge_core::UdfBridgeConfig;
use udfbridge_engine::TranslationOrchestrator;

use crate::error::CliError;

/// Path argument that selects standard input.
pub const STDIN_MARKER: &str = "-";

/// Read a rule file, or standard input when `path` is `-`.
pub async fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == STDIN_MARKER {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .map_err(|source| CliError::Input {
                path: "<stdin>".to_owned(),
                source,
            })?;
        return Ok(content);
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Input {
            path: path.display().to_string(),
            source,
        })
}

/// Load the effective configuration.
///
/// With a path the file is parsed, env overrides applied and the result validated.
/// Without one, built-in defaults plus `UDFBRIDGE_*` overrides are used.
pub async fn load_config(path: Option<&Path>) -> Result<UdfBridgeConfig, CliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration");
            Ok(UdfBridgeConfig::load(path).await?)
        }
        None => {
            let mut config = UdfBridgeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Build an orchestrator over the registry derived from `config`.
pub fn build_orchestrator(config: UdfBridgeConfig) -> Result<TranslationOrchestrator, CliError> {
    Ok(TranslationOrchestrator::builder().config(config).build()?)
}
