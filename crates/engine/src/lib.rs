#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`orchestrator`]: 번역 진입점, 검증 전용 호출, 통계와 헬스
//! - [`batch`]: 세마포어로 제한된 배치 번역
//! - [`breaker`]: 플랫폼 쌍별 회로 차단기
//! - [`flight`]: 동일 요청 중복 제거 (single-flight)
//! - [`cache`]: 핑거프린트 키 결과 캐시
//! - [`fingerprint`]: 요청 핑거프린트
//! - [`remote`]: 원격 검증 훅과 재시도
//! - [`stats`]: 원자적 처리 통계
//! - [`request`]: 요청 옵션과 배치 타입

pub mod batch;
pub mod breaker;
pub mod cache;
pub mod codes;
pub mod error;
pub mod fingerprint;
pub mod flight;
pub mod orchestrator;
pub mod remote;
pub mod request;
pub mod stats;

pub use breaker::{CircuitSnapshot, CircuitState};
pub use error::EngineError;
pub use fingerprint::Fingerprint;
pub use orchestrator::{OrchestratorBuilder, TranslationOrchestrator, ValidationReport};
pub use remote::RemoteValidator;
pub use request::{BatchItem, BatchRequest, BatchResult, RequestOptions};
pub use stats::StatsSnapshot;
