//! 번역기 trait — 플랫폼 네이티브 문법과 UDF 사이의 변환 계약
//!
//! 각 플랫폼 번역기는 세 가지 연산을 구현합니다:
//! - [`Translator::to_udf`]: 네이티브 콘텐츠 → UDF
//! - [`Translator::from_udf`]: UDF → 네이티브 콘텐츠
//! - [`Translator::validate_content`]: 번역된 콘텐츠 재파싱 및 품질 지표 산출
//!
//! 번역기는 요청 단위 상태를 갖지 않으며, 필드 매핑 같은 내부 테이블은
//! 읽기 전용으로 공유됩니다. 따라서 `Send + Sync`를 요구합니다.

use std::future::Future;
use std::pin::Pin;

use crate::error::TranslationError;
use crate::udf::{ConversionOptions, PlatformFamily, PlatformMetadata, QualityMetrics, Rendition, UniversalFormat};

/// 동적 디스패치용 boxed future 타입
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 플랫폼 번역기
pub trait Translator: Send + Sync {
    /// 등록 식별자 (소문자, 예: `splunk`)
    fn platform(&self) -> &str;

    /// 플랫폼 계열
    fn family(&self) -> PlatformFamily;

    /// 호환성 및 튜닝 프로필
    fn metadata(&self) -> &PlatformMetadata;

    /// 네이티브 콘텐츠를 UDF로 파싱합니다.
    ///
    /// 플랫폼이 선언한 구조 패턴이 모두 일치하지 않으면 `Parse` 에러를 반환합니다.
    fn to_udf(&self, raw: &str) -> Result<UniversalFormat, TranslationError>;

    /// UDF를 네이티브 문법으로 렌더링합니다.
    fn from_udf(
        &self,
        udf: &UniversalFormat,
        options: &ConversionOptions,
    ) -> Result<Rendition, TranslationError>;

    /// 콘텐츠를 재파싱하여 품질 지표를 산출합니다.
    ///
    /// 플랫폼 문법으로 전혀 해석할 수 없을 때만 `Validation` 에러를 반환하며,
    /// 낮은 점수는 경고로만 보고합니다.
    fn validate_content(&self, content: &str) -> Result<QualityMetrics, TranslationError>;
}
