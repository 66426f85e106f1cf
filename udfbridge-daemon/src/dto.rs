//! Request and response bodies of the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use udfbridge_core::{PlatformFamily, QualityMetrics, TranslationResult, Warning, WarningLevel};
use udfbridge_engine::{BatchRequest, BatchResult, CircuitSnapshot, RequestOptions, StatsSnapshot};

use crate::api_error::ErrorBody;

// ─── Translate ──────────────────────────────────────────────────────

/// `POST /v1/translate`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslateRequest {
    /// Caller-side identifier echoed back in the response.
    #[serde(default)]
    pub detection_id: Option<String>,
    pub content: String,
    pub source_platform: String,
    pub target_platform: String,
    #[serde(default)]
    pub options: RequestOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<String>,
    pub translated_content: String,
    pub target_platform: String,
    pub confidence_score: f64,
    pub quality_metrics: QualityMetrics,
    pub warnings: Vec<Warning>,
    pub translated_at: DateTime<Utc>,
}

impl TranslationResponse {
    pub fn new(
        detection_id: Option<String>,
        target_platform: impl Into<String>,
        result: TranslationResult,
    ) -> Self {
        Self {
            detection_id,
            translated_content: result.content,
            target_platform: target_platform.into(),
            confidence_score: result.confidence_score,
            quality_metrics: result.quality_metrics,
            warnings: result.warnings,
            translated_at: result.translated_at,
        }
    }
}

// ─── Batch ──────────────────────────────────────────────────────────

/// `POST /v1/translate/batch`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchTranslateRequest {
    pub requests: Vec<BatchRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub responses: Vec<TranslationResponse>,
    pub errors: Vec<BatchError>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchResponse {
    /// Split engine results into successes and failures.
    ///
    /// `targets` holds the target platform of each submitted request, in
    /// submission order, which is also the order of `result.items`.
    pub fn from_result(result: BatchResult, targets: Vec<String>) -> Self {
        let mut responses = Vec::with_capacity(result.success_count);
        let mut errors = Vec::with_capacity(result.failure_count);

        for (item, target) in result.items.into_iter().zip(targets) {
            match item.outcome {
                Ok(translated) => responses.push(TranslationResponse::new(
                    Some(item.request_id),
                    target,
                    translated,
                )),
                Err(err) => errors.push(BatchError {
                    request_id: item.request_id,
                    error: ErrorBody::from(&err),
                }),
            }
        }

        Self {
            responses,
            errors,
            success_count: result.success_count,
            failure_count: result.failure_count,
        }
    }
}

// ─── Validate ───────────────────────────────────────────────────────

/// `POST /v1/validate`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateRequest {
    pub content: String,
    pub target_platform: String,
}

/// Validation-only outcome: the summary warning plus detailed metrics.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub code: String,
    pub message: String,
    pub level: WarningLevel,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,
}

// ─── Introspection ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub id: String,
    pub family: PlatformFamily,
    pub min_version: String,
    pub max_version: String,
    /// Deployed version from `[platforms.<id>]`, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_version: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub cached_results: usize,
    pub cache_capacity: usize,
    pub circuits: Vec<CircuitSnapshot>,
}
