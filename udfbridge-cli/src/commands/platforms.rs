//! `udfbridge platforms` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use udfbridge_core::{PlatformFamily, Translator};
use udfbridge_engine::TranslationOrchestrator;

use crate::commands::{build_orchestrator, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `platforms` command.
pub async fn execute(config_path: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let orchestrator = build_orchestrator(config)?;
    writer.render(&PlatformsReport::collect(&orchestrator))
}

/// Registered platforms, sorted by id.
#[derive(Debug, Serialize)]
pub struct PlatformsReport {
    pub platforms: Vec<PlatformLine>,
}

#[derive(Debug, Serialize)]
pub struct PlatformLine {
    pub id: String,
    pub family: PlatformFamily,
    pub min_version: String,
    pub max_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_version: Option<String>,
}

impl PlatformsReport {
    pub fn collect(orchestrator: &TranslationOrchestrator) -> Self {
        let registry = orchestrator.registry();
        let config = orchestrator.config();
        let platforms = registry
            .ids()
            .into_iter()
            .filter_map(|id| registry.get(&id).ok())
            .map(|translator: Arc<dyn Translator>| {
                let metadata = translator.metadata();
                PlatformLine {
                    id: translator.platform().to_owned(),
                    family: translator.family(),
                    min_version: metadata.min_version.clone(),
                    max_version: metadata.max_version.clone(),
                    configured_version: config
                        .platform(translator.platform())
                        .map(|p| p.version.clone()),
                }
            })
            .collect();
        Self { platforms }
    }
}

impl Render for PlatformsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "{:<20} {:<8} {:<24} {}",
            "Platform", "Family", "Supported", "Configured"
        )?;
        writeln!(w, "{}", "-".repeat(64))?;
        for p in &self.platforms {
            writeln!(
                w,
                "{:<20} {:<8} {:<24} {}",
                p.id.bold(),
                p.family.as_str(),
                format!("{} - {}", p.min_version, p.max_version),
                p.configured_version.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udfbridge_core::UdfBridgeConfig;

    #[test]
    fn test_collect_lists_default_platforms_sorted() {
        // Given: An orchestrator over the default registry
        let orchestrator = build_orchestrator(UdfBridgeConfig::default()).expect("should build");

        // When
        let report = PlatformsReport::collect(&orchestrator);

        // Then
        let ids: Vec<&str> = report.platforms.iter().map(|p| p.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "platforms should be sorted");
        assert!(ids.contains(&"suricata"));
        assert!(report.platforms.iter().all(|p| p.configured_version.is_none()));
    }

    #[test]
    fn test_render_text_shows_family() {
        colored::control::set_override(false);
        let report = PlatformsReport {
            platforms: vec![PlatformLine {
                id: "splunk".to_owned(),
                family: PlatformFamily::Siem,
                min_version: "7.0.0".to_owned(),
                max_version: "9.9.9".to_owned(),
                configured_version: Some("9.1.0".to_owned()),
            }],
        };

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("splunk"));
        assert!(output.contains("SIEM"));
        assert!(output.contains("9.1.0"));
    }
}
