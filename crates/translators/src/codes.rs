//! 번역기가 생성하는 경고 코드

/// 필수 필드 누락
pub const MISSING_REQUIRED_FIELD: &str = "MISSING_REQUIRED_FIELD";
/// 구조 패턴 불일치
pub const INVALID_SYNTAX: &str = "INVALID_SYNTAX";
/// 설정된 검증 규칙 위반
pub const CONFIG_RULE_VIOLATION: &str = "CONFIG_RULE_VIOLATION";
/// 조건 특이도 부족
pub const LOW_SPECIFICITY: &str = "LOW_SPECIFICITY";
/// 복잡도 과다
pub const HIGH_COMPLEXITY: &str = "HIGH_COMPLEXITY";

/// 대상 방언이 표현하지 못하는 필드를 페이로드 검색으로 근사
pub const FIELD_APPROXIMATED: &str = "FIELD_APPROXIMATED";
/// 다른 방언의 파이프라인 단계 제거
pub const STAGE_DROPPED: &str = "STAGE_DROPPED";
/// 대상 방언이 담지 못하는 메타데이터 제거
pub const METADATA_DROPPED: &str = "METADATA_DROPPED";
/// 벤더 필드 매핑 없음
pub const FIELD_UNMAPPED: &str = "FIELD_UNMAPPED";
/// 필수 범위 필드를 `*`로 채움
pub const SCOPE_WILDCARD: &str = "SCOPE_WILDCARD";
/// `sid` 자동 부여
pub const SID_ASSIGNED: &str = "SID_ASSIGNED";
/// 대상 버전이 지원 범위 밖
pub const VERSION_UNSUPPORTED: &str = "VERSION_UNSUPPORTED";
/// 대상 버전을 해석할 수 없음
pub const VERSION_UNPARSEABLE: &str = "VERSION_UNPARSEABLE";
