//! 번역기 에러 타입
//!
//! [`TranslatorError`]는 방언 파싱, 렌더링, 레지스트리 구성 중 발생하는 에러를 표현합니다.
//! `From<TranslatorError> for TranslationError` 변환이 구현되어 있어
//! [`Translator`](udfbridge_core::Translator) 구현에서 `?`로 전파할 수 있습니다.

use udfbridge_core::error::TranslationError;

/// 번역기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    /// 콘텐츠를 플랫폼 문법으로 해석할 수 없음
    #[error("syntax error: {platform}: {reason}")]
    Syntax {
        /// 플랫폼 식별자
        platform: String,
        /// 실패 사유
        reason: String,
    },

    /// UDF를 플랫폼 문법으로 렌더링할 수 없음
    #[error("render error: {platform}: {reason}")]
    Render {
        /// 플랫폼 식별자
        platform: String,
        /// 실패 사유
        reason: String,
    },

    /// UDF 본문이 정규 규칙 형식이 아님
    #[error("malformed rule body: {0}")]
    RuleBody(#[from] serde_json::Error),

    /// 등록되지 않은 플랫폼
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// 설정 에러 (검증 규칙 정규식 등)
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl TranslatorError {
    pub(crate) fn syntax(platform: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            platform: platform.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn render(platform: &str, reason: impl Into<String>) -> Self {
        Self::Render {
            platform: platform.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<TranslatorError> for TranslationError {
    fn from(err: TranslatorError) -> Self {
        match err {
            TranslatorError::Syntax { platform, reason } => {
                TranslationError::Parse { platform, reason }
            }
            TranslatorError::Render { platform, reason } => {
                TranslationError::Conversion { platform, reason }
            }
            TranslatorError::RuleBody(e) => TranslationError::Conversion {
                platform: "udf".to_owned(),
                reason: e.to_string(),
            },
            TranslatorError::UnknownPlatform(platform) => {
                TranslationError::UnsupportedPlatform { platform }
            }
            other => TranslationError::Internal(other.to_string()),
        }
    }
}
