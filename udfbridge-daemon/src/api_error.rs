//! HTTP error mapping for the translation API.
//!
//! | Error | Status |
//! |---|---|
//! | invalid input, unsupported platform, oversized batch | 400 |
//! | malformed or oversized body | status chosen by the extractor |
//! | parse, conversion, validation, accuracy threshold | 422 |
//! | circuit open | 503 + `Retry-After` |
//! | timeout | 504 |
//! | internal | 500 |

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use udfbridge_core::{TranslationError, TranslationResult};

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before reaching the engine.
    BadRequest(String),
    /// Body could not be extracted as JSON.
    Body(JsonRejection),
    /// Failure reported by the translation engine.
    Translation(TranslationError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Body(rejection) => rejection.status(),
            Self::Translation(err) => translation_status(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        Self::Translation(err)
    }
}

/// Map an engine error to its HTTP status.
pub fn translation_status(err: &TranslationError) -> StatusCode {
    match err {
        TranslationError::InvalidInput { .. } | TranslationError::UnsupportedPlatform { .. } => {
            StatusCode::BAD_REQUEST
        }
        TranslationError::Parse { .. }
        | TranslationError::Conversion { .. }
        | TranslationError::Validation { .. }
        | TranslationError::AccuracyThreshold { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TranslationError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
        TranslationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        TranslationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body.
///
/// Also used for per-item failures inside batch responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable snake_case error code.
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    /// Computed result attached to accuracy threshold failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_result: Option<TranslationResult>,
}

impl ErrorBody {
    fn plain(code: &'static str, message: String) -> Self {
        Self {
            code,
            message,
            retryable: false,
            partial_result: None,
        }
    }
}

impl From<&TranslationError> for ErrorBody {
    fn from(err: &TranslationError) -> Self {
        Self {
            code: err.kind(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            partial_result: err.partial_result().cloned(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::BadRequest(message) => (status, Json(ErrorBody::plain("bad_request", message)))
                .into_response(),
            Self::Body(rejection) => (
                status,
                Json(ErrorBody::plain("invalid_body", rejection.body_text())),
            )
                .into_response(),
            Self::Translation(err) => {
                let mut response = (status, Json(ErrorBody::from(&err))).into_response();
                if let TranslationError::CircuitOpen { retry_after_ms, .. } = &err {
                    // Retry-After is whole seconds, rounded up.
                    let secs = retry_after_ms.div_ceil(1000).max(1);
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                }
                response
            }
        }
    }
}
