//! 오케스트레이터가 생성하는 경고 코드

/// 비엄격 모드에서 UDF 구조 검사 실패
pub const UDF_INVALID: &str = "UDF_INVALID";
/// 원격 검증 재시도 소진
pub const REMOTE_VALIDATION_UNAVAILABLE: &str = "REMOTE_VALIDATION_UNAVAILABLE";

// ─── 검증 요약 ─────────────────────────────────────────────────────

/// 콘텐츠를 대상 플랫폼 문법으로 해석할 수 없음
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
/// 해석은 되지만 Major 경고가 있음
pub const VALIDATION_DEGRADED: &str = "VALIDATION_DEGRADED";
/// 검증 통과
pub const VALIDATION_SUCCESS: &str = "VALIDATION_SUCCESS";
