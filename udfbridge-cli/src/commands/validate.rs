//! `udfbridge validate` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use udfbridge_core::{QualityMetrics, WarningLevel};
use udfbridge_engine::codes::VALIDATION_FAILED;
use udfbridge_engine::{TranslationOrchestrator, ValidationReport};

use crate::cli::ValidateArgs;
use crate::commands::{build_orchestrator, load_config, read_input};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, level_label};

/// Execute the `validate` command.
pub async fn execute(
    args: ValidateArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let content = read_input(&args.input).await?;
    let config = load_config(config_path).await?;
    let orchestrator = build_orchestrator(config)?;
    run(&orchestrator, &content, &args.platform, writer, &mut std::io::stdout())
}

/// Validate `content` against `platform` and render the verdict to `out`.
///
/// The report is always rendered; content the platform cannot interpret
/// is then reported as [`CliError::Invalid`].
pub fn run(
    orchestrator: &TranslationOrchestrator,
    content: &str,
    platform: &str,
    writer: &OutputWriter,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    info!(platform, "validating rule");
    let report = ValidateReport::from(orchestrator.validate(content, platform)?);
    writer.render_to(&report, out)?;

    if report.code == VALIDATION_FAILED {
        return Err(CliError::Invalid(report.platform));
    }
    Ok(())
}

/// Validation verdict.
#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub platform: String,
    pub code: String,
    pub message: String,
    pub level: WarningLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,
}

impl From<ValidationReport> for ValidateReport {
    fn from(report: ValidationReport) -> Self {
        Self {
            platform: report.platform,
            code: report.summary.code,
            message: report.summary.message,
            level: report.summary.level,
            metrics: report.metrics,
        }
    }
}

impl Render for ValidateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Validation: {}", self.platform.bold())?;
        writeln!(
            w,
            "  Result: {} {} {}",
            level_label(self.level),
            self.code.bold(),
            self.message
        )?;

        if let Some(ref m) = self.metrics {
            writeln!(
                w,
                "  Accuracy: {:.3}  False positives: {:.3}  Performance impact: {}",
                m.accuracy_score, m.false_positive_rate, m.performance_impact
            )?;
            for warning in &m.validation_warnings {
                writeln!(
                    w,
                    "    {} {} {}",
                    level_label(warning.level),
                    warning.code,
                    warning.message
                )?;
            }
        }
        Ok(())
    }
}
