#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`rule`]: 정규 규칙 본문 (UDF `content`)
//! - [`mapping`]: 정규 필드 ↔ 플랫폼 필드, 이벤트 범주 매핑
//! - [`syntax`]: 시그니처, 검색 질의, Zeek 스크립트 파서와 렌더러
//! - [`quality`]: 정확도, 오탐률, 성능 영향도 산출
//! - [`platform`]: 방언별 [`Translator`](udfbridge_core::Translator) 구현
//! - [`registry`]: 플랫폼 식별자 → 번역기
//! - [`codes`]: 경고 코드
//! - [`error`]: 도메인 에러 타입
//!
//! # 번역 경로
//!
//! ```text
//! native ──parse──> RuleBody ──envelope──> UDF ──render──> native
//!                      │                                     │
//!                 QualityAnalyzer                    warnings (근사, 누락)
//! ```

pub mod codes;
pub mod error;
pub mod mapping;
pub mod platform;
pub mod quality;
pub mod registry;
pub mod rule;
pub mod syntax;

// --- 주요 타입 re-export ---

pub use error::TranslatorError;
pub use platform::edr::EdrDialect;
pub use platform::nsm::{SignatureDialect, ZeekDialect};
pub use platform::siem::QueryPlatform;
pub use platform::{Dialect, PlatformTranslator};
pub use quality::QualityAnalyzer;
pub use registry::TranslatorRegistry;
pub use rule::{Condition, Operator, RuleBody};
