//! `udfbridge config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use udfbridge_core::UdfBridgeConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Config sections accepted by `config show --section`.
pub const SECTIONS: [&str; 5] = ["general", "server", "engine", "metrics", "platforms"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => {
            let report = validate_report(config_path).await;
            writer.render(&report)?;
            if !report.valid {
                return Err(CliError::Config("configuration is invalid".to_owned()));
            }
            Ok(())
        }
        ConfigAction::Show { section } => {
            let report = show_report(config_path, section.as_deref()).await?;
            writer.render(&report)
        }
    }
}

fn source_label(config_path: Option<&Path>) -> String {
    config_path.map_or_else(|| "(defaults)".to_owned(), |p| p.display().to_string())
}

/// Load and validate the configuration, collecting the error instead of failing.
pub async fn validate_report(config_path: Option<&Path>) -> ConfigValidationReport {
    info!(source = %source_label(config_path), "validating configuration");

    let errors = match load_config(config_path).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };
    ConfigValidationReport {
        source: source_label(config_path),
        valid: errors.is_empty(),
        errors,
    }
}

/// Effective configuration (file + env overrides + defaults), optionally one section.
pub async fn show_report(
    config_path: Option<&Path>,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config = load_config(config_path).await?;
    let config_toml = match section {
        None => to_toml(&config),
        Some(name) => section_toml(&config, name)?,
    };
    Ok(ConfigReport {
        source: source_label(config_path),
        section: section.map(str::to_owned),
        config_toml,
    })
}

fn section_toml(config: &UdfBridgeConfig, name: &str) -> Result<String, CliError> {
    let rendered = match name {
        "general" => to_toml(&config.general),
        "server" => to_toml(&config.server),
        "engine" => to_toml(&config.engine),
        "metrics" => to_toml(&config.metrics),
        "platforms" => to_toml(&config.platforms),
        _ => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                name,
                SECTIONS.join(", ")
            )));
        }
    };
    Ok(rendered)
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    /// Header lines are TOML comments so the output can be saved as a config file.
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match self.section {
            Some(ref section) => writeln!(w, "# [{}] from {}", section, self.source)?,
            None => writeln!(w, "# effective configuration from {}", self.source)?,
        }
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty if valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("udfbridge.toml");
        std::fs::write(&path, body).expect("should write config");
        path
    }

    #[tokio::test]
    async fn test_validate_report_valid_file() {
        // Given: A config overriding the engine floor
        let dir = TempDir::new().expect("should create temp dir");
        let path = write_config(&dir, "[engine]\naccuracy_floor = 0.95\n");

        // When
        let report = validate_report(Some(&path)).await;

        // Then
        assert!(report.valid, "errors: {:?}", report.errors);
        assert!(report.source.ends_with("udfbridge.toml"));
    }

    #[tokio::test]
    async fn test_validate_report_collects_error() {
        let dir = TempDir::new().expect("should create temp dir");
        let path = write_config(&dir, "[server]\nport = 0\n");

        let report = validate_report(Some(&path)).await;

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("port"), "got: {:?}", report.errors);
    }

    #[tokio::test]
    async fn test_show_report_single_section() {
        let dir = TempDir::new().expect("should create temp dir");
        let path = write_config(&dir, "[engine]\ncache_capacity = 64\n");

        let report = show_report(Some(&path), Some("engine"))
            .await
            .expect("engine section should render");

        assert_eq!(report.section.as_deref(), Some("engine"));
        assert!(report.config_toml.contains("cache_capacity = 64"));
        assert!(!report.config_toml.contains("[server]"));
    }

    #[tokio::test]
    async fn test_show_report_unknown_section() {
        let dir = TempDir::new().expect("should create temp dir");
        let path = write_config(&dir, "");

        let err = show_report(Some(&path), Some("logging"))
            .await
            .err()
            .expect("unknown section should fail");

        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("expected: general"));
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        let report = ConfigReport {
            source: "/etc/udfbridge/udfbridge.toml".to_owned(),
            section: Some("metrics".to_owned()),
            config_toml: "enabled = false\n".to_owned(),
        };

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(
            output.starts_with("# [metrics] from /etc/udfbridge/udfbridge.toml"),
            "got: {}",
            output
        );
        assert!(output.contains("enabled = false"), "should show config content");
    }

    #[test]
    fn test_config_report_json_skips_toml_body() {
        let report = ConfigReport {
            source: "udfbridge.toml".to_owned(),
            section: None,
            config_toml: "[general]".to_owned(),
        };

        let parsed = serde_json::to_value(&report).expect("JSON serialization should succeed");

        assert_eq!(parsed["source"].as_str(), Some("udfbridge.toml"));
        assert!(parsed.get("section").is_none());
        assert!(
            parsed.get("config_toml").is_none(),
            "config_toml should be skipped"
        );
    }

    #[test]
    fn test_config_validation_report_invalid() {
        colored::control::set_override(false);
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid value for 'server.port': must be greater than 0".to_owned()],
        };

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("INVALID"), "should show invalid status");
        assert!(output.contains("server.port"), "should show error message");
    }
}
