//! `udfbridge translate` command handler

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use udfbridge_core::{QualityMetrics, TranslationResult, Warning};
use udfbridge_engine::{RequestOptions, TranslationOrchestrator};

use crate::cli::TranslateArgs;
use crate::commands::{build_orchestrator, load_config, read_input};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, level_label, score_label};

/// Execute the `translate` command.
pub async fn execute(
    args: TranslateArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let content = read_input(&args.input).await?;
    let config = load_config(config_path).await?;
    let orchestrator = build_orchestrator(config)?;
    run(&orchestrator, &content, &args, writer, &mut std::io::stdout()).await
}

/// Translate `content` and render the report to `out`.
///
/// A result below the accuracy floor is still rendered, then reported as a
/// translation failure so the process exits non-zero.
pub async fn run(
    orchestrator: &TranslationOrchestrator,
    content: &str,
    args: &TranslateArgs,
    writer: &OutputWriter,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let options = request_options(args).resolve(&orchestrator.default_options());
    let floor = orchestrator.config().accuracy_floor_for(&args.to);
    info!(from = %args.from, to = %args.to, "translating rule");

    match orchestrator
        .translate(content, &args.from, &args.to, options)
        .await
    {
        Ok(result) => {
            let report = TranslateReport::new(args, floor, true, result);
            writer.render_to(&report, out)
        }
        Err(e) => {
            if let Some(partial) = e.partial_result() {
                warn!(to = %args.to, floor, "translation below accuracy floor");
                let report = TranslateReport::new(args, floor, false, partial.clone());
                writer.render_to(&report, out)?;
            }
            Err(e.into())
        }
    }
}

fn request_options(args: &TranslateArgs) -> RequestOptions {
    RequestOptions {
        timeout_ms: args.timeout_secs.map(|s| s.saturating_mul(1000)),
        optimization_level: args.optimization_level,
        strict_validation: args.no_strict.then_some(false),
        retry_attempts: None,
        preserve_comments: args.preserve_comments.then_some(true),
        target_version: args.target_version.clone(),
        source_version: args.source_version.clone(),
    }
}

/// Translation report.
#[derive(Debug, Serialize)]
pub struct TranslateReport {
    pub source_platform: String,
    pub target_platform: String,
    /// `false` when the confidence score is below `accuracy_floor`.
    pub accepted: bool,
    pub accuracy_floor: f64,
    pub confidence_score: f64,
    pub translated_content: String,
    pub quality_metrics: QualityMetrics,
    pub warnings: Vec<Warning>,
    pub translated_at: DateTime<Utc>,
}

impl TranslateReport {
    fn new(args: &TranslateArgs, floor: f64, accepted: bool, result: TranslationResult) -> Self {
        Self {
            source_platform: args.from.clone(),
            target_platform: args.to.clone(),
            accepted,
            accuracy_floor: floor,
            confidence_score: result.confidence_score,
            translated_content: result.content,
            quality_metrics: result.quality_metrics,
            warnings: result.warnings,
            translated_at: result.translated_at,
        }
    }
}

impl Render for TranslateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let verdict = if self.accepted {
            "ACCEPTED".green().bold()
        } else {
            "BELOW FLOOR".red().bold()
        };
        writeln!(
            w,
            "Translation {} -> {}: {}",
            self.source_platform.bold(),
            self.target_platform.bold(),
            verdict
        )?;

        let m = &self.quality_metrics;
        writeln!(
            w,
            "  Confidence: {} (floor {:.3})",
            score_label(self.confidence_score, self.accuracy_floor),
            self.accuracy_floor
        )?;
        writeln!(
            w,
            "  Accuracy: {:.3}  False positives: {:.3}  Performance impact: {}",
            m.accuracy_score, m.false_positive_rate, m.performance_impact
        )?;

        if !self.warnings.is_empty() {
            writeln!(w, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(
                    w,
                    "    {} {} {}",
                    level_label(warning.level),
                    warning.code.bold(),
                    warning.message
                )?;
            }
        }

        writeln!(w)?;
        writeln!(w, "{}", self.translated_content)?;
        Ok(())
    }
}
