//! 에러 타입 — 도메인별 에러 정의
//!
//! [`TranslationError`]는 번역 요청 하나가 실패할 수 있는 모든 경우를 표현합니다.
//! 중복 제거(single-flight)된 대기자들이 리더의 결과를 그대로 받아야 하므로
//! `Clone`을 구현합니다.

use crate::udf::TranslationResult;

/// udfbridge 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum UdfBridgeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 번역 에러
    #[error("translation error: {0}")]
    Translation(#[from] TranslationError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 번역 파이프라인 에러
///
/// 재시도 가능 여부는 [`TranslationError::is_retryable`]로 판단합니다.
/// 번역 로직은 결정적이므로 `CircuitOpen`과 `Timeout`만 재시도 대상입니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TranslationError {
    /// 번역 작업 시작 전 입력 검증 실패
    #[error("invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// 등록되지 않은 플랫폼 식별자
    #[error("unsupported platform: {platform}")]
    UnsupportedPlatform { platform: String },

    /// 원본 콘텐츠를 플랫폼 문법으로 해석할 수 없음
    #[error("failed to parse {platform} content: {reason}")]
    Parse { platform: String, reason: String },

    /// UDF를 대상 플랫폼 문법으로 렌더링하지 못함
    #[error("failed to render {platform} content: {reason}")]
    Conversion { platform: String, reason: String },

    /// 엄격 모드 UDF 검증 실패 또는 번역 결과 검증 실패
    #[error("validation failed for {platform}: {reason}")]
    Validation { platform: String, reason: String },

    /// 번역은 완료되었으나 정확도가 허용 하한 미만
    #[error("accuracy {accuracy:.3} for {platform} is below floor {floor:.3}")]
    AccuracyThreshold {
        platform: String,
        accuracy: f64,
        floor: f64,
        /// 계산된 결과 (호출자가 경고와 함께 수용할지 결정)
        result: Box<TranslationResult>,
    },

    /// 회로 차단기 열림 — 쿨다운 후 재시도 가능
    #[error("circuit open for {pair}, retry after {retry_after_ms}ms")]
    CircuitOpen { pair: String, retry_after_ms: u64 },

    /// 제한 시간 초과
    #[error("translation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// 내부 에러 (작업자 패닉 등)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TranslationError {
    /// 같은 입력으로 다시 시도했을 때 다른 결과를 기대할 수 있는지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::Timeout { .. })
    }

    /// 메트릭 레이블과 API 응답에 쓰이는 안정적인 에러 코드
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UnsupportedPlatform { .. } => "unsupported_platform",
            Self::Parse { .. } => "parse",
            Self::Conversion { .. } => "conversion",
            Self::Validation { .. } => "validation",
            Self::AccuracyThreshold { .. } => "accuracy_threshold",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// 입력 검증 에러를 만드는 편의 생성자
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 부분 계산된 결과가 있으면 반환합니다 (`AccuracyThreshold`만 해당).
    pub fn partial_result(&self) -> Option<&TranslationResult> {
        match self {
            Self::AccuracyThreshold { result, .. } => Some(result),
            _ => None,
        }
    }
}
