//! REST/JSON transport for the translation engine.
//!
//! # Routes
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/v1/translate` | single translation |
//! | POST | `/v1/translate/batch` | batch translation, partial results |
//! | POST | `/v1/validate` | validation only, no state changes |
//! | GET | `/v1/platforms` | registered translators |
//! | GET | `/v1/stats` | engine counters and circuits |
//! | GET | `/healthz` | aggregated health |

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use udfbridge_core::Translator;
use udfbridge_engine::TranslationOrchestrator;

use crate::api_error::ApiError;
use crate::dto::{
    BatchResponse, BatchTranslateRequest, PlatformInfo, StatsResponse, TranslateRequest,
    TranslationResponse, ValidateRequest, ValidateResponse,
};
use crate::health::DaemonHealth;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TranslationOrchestrator,
    pub started_at: Instant,
    pub max_batch_size: usize,
}

impl AppState {
    pub fn new(orchestrator: TranslationOrchestrator) -> Self {
        let max_batch_size = orchestrator.config().server.max_batch_size;
        Self {
            orchestrator,
            started_at: Instant::now(),
            max_batch_size,
        }
    }
}

/// Build the API router.
///
/// Request bodies are capped at `server.max_body_bytes`.
pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.orchestrator.config().server.max_body_bytes;

    Router::new()
        .route("/v1/translate", post(translate))
        .route("/v1/translate/batch", post(translate_batch))
        .route("/v1/validate", post(validate))
        .route("/v1/platforms", get(platforms))
        .route("/v1/stats", get(stats))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(request) = payload?;
    let options = request
        .options
        .resolve(&state.orchestrator.default_options());

    let result = state
        .orchestrator
        .translate(
            &request.content,
            &request.source_platform,
            &request.target_platform,
            options,
        )
        .await
        .inspect_err(|e| {
            tracing::debug!(
                source = %request.source_platform,
                target = %request.target_platform,
                error = %e,
                "translate request failed"
            );
        })?;

    Ok(Json(TranslationResponse::new(
        request.detection_id,
        request.target_platform,
        result,
    )))
}

async fn translate_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchTranslateRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(batch) = payload?;
    if batch.requests.len() > state.max_batch_size {
        return Err(ApiError::bad_request(format!(
            "batch of {} requests exceeds max_batch_size {}",
            batch.requests.len(),
            state.max_batch_size
        )));
    }

    let targets = batch
        .requests
        .iter()
        .map(|r| r.target_platform.clone())
        .collect();
    let result = state.orchestrator.translate_batch(batch.requests).await;

    Ok(Json(BatchResponse::from_result(result, targets)))
}

async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(request) = payload?;
    let report = state
        .orchestrator
        .validate(&request.content, &request.target_platform)?;

    Ok(Json(ValidateResponse {
        code: report.summary.code,
        message: report.summary.message,
        level: report.summary.level,
        platform: report.platform,
        metrics: report.metrics,
    }))
}

async fn platforms(State(state): State<AppState>) -> Json<Vec<PlatformInfo>> {
    Json(platform_infos(&state.orchestrator))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let orchestrator = &state.orchestrator;
    Json(StatsResponse {
        stats: orchestrator.stats(),
        cached_results: orchestrator.cached_results(),
        cache_capacity: orchestrator.cache_capacity(),
        circuits: orchestrator.circuits(),
    })
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<DaemonHealth>) {
    let health = DaemonHealth::collect(&state.orchestrator, state.started_at);
    let status = if health.status.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(health))
}

/// Registered translators in id order.
pub fn platform_infos(orchestrator: &TranslationOrchestrator) -> Vec<PlatformInfo> {
    let registry = orchestrator.registry();
    let config = orchestrator.config();
    registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.get(&id).ok())
        .map(|translator: Arc<dyn Translator>| {
            let metadata = translator.metadata();
            PlatformInfo {
                id: translator.platform().to_owned(),
                family: translator.family(),
                min_version: metadata.min_version.clone(),
                max_version: metadata.max_version.clone(),
                configured_version: config
                    .platform(translator.platform())
                    .map(|p| p.version.clone()),
            }
        })
        .collect()
}
