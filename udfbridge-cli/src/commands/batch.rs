//! `udfbridge batch` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use udfbridge_engine::{BatchRequest, BatchResult, TranslationOrchestrator};

use crate::cli::BatchArgs;
use crate::commands::{build_orchestrator, load_config, read_input};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `batch` command.
pub async fn execute(
    args: BatchArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let raw = read_input(&args.file).await?;
    let config = load_config(config_path).await?;
    let orchestrator = build_orchestrator(config)?;
    run(&orchestrator, &raw, writer, &mut std::io::stdout()).await
}

/// Translate every request in the JSON array `raw` and render the outcome.
///
/// Returns [`CliError::Partial`] after rendering when any item failed.
pub async fn run(
    orchestrator: &TranslationOrchestrator,
    raw: &str,
    writer: &OutputWriter,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let requests: Vec<BatchRequest> = serde_json::from_str(raw)?;
    let limit = orchestrator.config().server.max_batch_size;
    if requests.len() > limit {
        return Err(CliError::Command(format!(
            "batch holds {} requests, limit is {}",
            requests.len(),
            limit
        )));
    }

    let targets: Vec<String> = requests.iter().map(|r| r.target_platform.clone()).collect();
    info!(requests = requests.len(), "translating batch");
    let result = orchestrator.translate_batch(requests).await;

    let report = BatchReport::new(result, targets);
    writer.render_to(&report, out)?;

    if report.failure_count > 0 {
        return Err(CliError::Partial {
            failed: report.failure_count,
            total: report.items.len(),
        });
    }
    Ok(())
}

/// Batch outcome, one line per request in submission order.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchLine>,
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchLine {
    pub request_id: String,
    pub target_platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchLineError>,
}

#[derive(Debug, Serialize)]
pub struct BatchLineError {
    pub code: &'static str,
    pub message: String,
}

impl BatchReport {
    fn new(result: BatchResult, targets: Vec<String>) -> Self {
        let items = result
            .items
            .into_iter()
            .zip(targets)
            .map(|(item, target_platform)| match item.outcome {
                Ok(translated) => BatchLine {
                    request_id: item.request_id,
                    target_platform,
                    confidence_score: Some(translated.confidence_score),
                    translated_content: Some(translated.content),
                    error: None,
                },
                Err(e) => BatchLine {
                    request_id: item.request_id,
                    target_platform,
                    confidence_score: None,
                    translated_content: None,
                    error: Some(BatchLineError {
                        code: e.kind(),
                        message: e.to_string(),
                    }),
                },
            })
            .collect();
        Self {
            items,
            success_count: result.success_count,
            failure_count: result.failure_count,
        }
    }
}

impl Render for BatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "Batch: {} succeeded, {} failed",
            self.success_count.to_string().green().bold(),
            self.failure_count.to_string().red().bold()
        )?;
        writeln!(w, "{:<40} {:<20} {:<10} Detail", "Request", "Target", "Status")?;
        writeln!(w, "{}", "-".repeat(84))?;

        for line in &self.items {
            match (&line.error, line.confidence_score) {
                (Some(err), _) => writeln!(
                    w,
                    "{:<40} {:<20} {:<10} {}: {}",
                    line.request_id,
                    line.target_platform,
                    "FAILED".red(),
                    err.code,
                    err.message
                )?,
                (None, score) => writeln!(
                    w,
                    "{:<40} {:<20} {:<10} confidence {:.3}",
                    line.request_id,
                    line.target_platform,
                    "OK".green(),
                    score.unwrap_or_default()
                )?,
            }
        }
        Ok(())
    }
}
