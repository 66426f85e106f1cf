//! 엔진 구성 에러
//!
//! 번역 요청 단위의 실패는 [`TranslationError`](udfbridge_core::TranslationError)로
//! 보고하며, [`EngineError`]는 오케스트레이터를 만드는 단계의 실패만 다룹니다.

use udfbridge_core::error::UdfBridgeError;
use udfbridge_translators::TranslatorError;

/// 오케스트레이터 구성 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 설정 검증 실패
    #[error("engine config error: {0}")]
    Config(#[from] UdfBridgeError),

    /// 번역기 레지스트리 구성 실패
    #[error("translator registry error: {0}")]
    Registry(#[from] TranslatorError),
}
