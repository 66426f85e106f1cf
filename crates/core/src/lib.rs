#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod translator;
pub mod udf;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, TranslationError, UdfBridgeError};

// 설정
pub use config::{PlatformConfig, UdfBridgeConfig};

// 헬스
pub use health::HealthStatus;

// 번역기 trait
pub use translator::{BoxFuture, Translator};

// UDF 모델
pub use udf::{
    AuditInfo, ConversionOptions, PerformanceImpact, PlatformFamily, PlatformMetadata,
    QualityMetrics, Rendition, TranslationOptions, TranslationResult, UniversalFormat, Warning,
    WarningLevel, confidence_score,
};
