//! 요청/응답 타입
//!
//! 데몬과 CLI가 공유하는 직렬화 가능한 요청 형태입니다. 요청 옵션은 모든 필드가
//! 선택 사항이며, 생략된 필드는 엔진 설정의 기본값으로 채워집니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use udfbridge_core::error::TranslationError;
use udfbridge_core::udf::{TranslationOptions, TranslationResult};

/// 요청 단위 옵션 (생략 시 엔진 기본값)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_comments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
}

impl RequestOptions {
    /// 기본 옵션 위에 지정된 필드만 덮어씁니다.
    pub fn resolve(&self, defaults: &TranslationOptions) -> TranslationOptions {
        TranslationOptions {
            timeout: self
                .timeout_ms
                .map_or(defaults.timeout, Duration::from_millis),
            optimization_level: self
                .optimization_level
                .unwrap_or(defaults.optimization_level),
            strict_validation: self.strict_validation.unwrap_or(defaults.strict_validation),
            retry_attempts: self.retry_attempts.unwrap_or(defaults.retry_attempts),
            preserve_comments: self.preserve_comments.unwrap_or(defaults.preserve_comments),
            target_version: self
                .target_version
                .clone()
                .or_else(|| defaults.target_version.clone()),
            source_version: self
                .source_version
                .clone()
                .or_else(|| defaults.source_version.clone()),
        }
    }
}

/// 배치 요청 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// 호출자 지정 식별자 (비어 있으면 엔진이 부여)
    #[serde(default)]
    pub request_id: String,
    pub content: String,
    pub source_platform: String,
    pub target_platform: String,
    #[serde(default)]
    pub options: RequestOptions,
}

/// 배치 항목 결과
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub request_id: String,
    pub outcome: Result<TranslationResult, TranslationError>,
}

/// 배치 결과
///
/// `items`는 제출 순서를 따르며 `success_count + failure_count`는 항상 요청 수와 같습니다.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchResult {
    pub(crate) fn from_items(items: Vec<BatchItem>) -> Self {
        let success_count = items.iter().filter(|i| i.outcome.is_ok()).count();
        let failure_count = items.len() - success_count;
        Self {
            items,
            success_count,
            failure_count,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
