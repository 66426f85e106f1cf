//! UDF (Universal Detection Format) — 플랫폼 중립 탐지 규칙 표현
//!
//! 모든 번역은 `원본 플랫폼 → UDF → 대상 플랫폼` 경로를 거칩니다.
//! [`UniversalFormat`]은 `ToUDF` 변환이 만들어낸 뒤에는 변경되지 않으며,
//! 번역 결과는 항상 새로운 [`TranslationResult`]로 생성됩니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── 플랫폼 계열 ────────────────────────────────────────────────────

/// 탐지 규칙이 속한 플랫폼 계열
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlatformFamily {
    /// SIEM 검색 질의
    Siem,
    /// EDR 행위 규칙
    Edr,
    /// 네트워크 시그니처 엔진
    Nsm,
}

impl PlatformFamily {
    /// 계열 식별자 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Siem => "SIEM",
            Self::Edr => "EDR",
            Self::Nsm => "NSM",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── 플랫폼 메타데이터 ──────────────────────────────────────────────

/// 플랫폼별 호환성 및 튜닝 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetadata {
    /// 지원 최소 버전 (semver)
    pub min_version: String,
    /// 지원 최대 버전 (semver)
    pub max_version: String,
    /// 규칙이 요구하는 플랫폼 기능 목록
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// 기능 이름 → 지원 여부
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
    /// 플랫폼 튜닝 힌트
    #[serde(default)]
    pub optimizations: BTreeMap<String, String>,
}

impl PlatformMetadata {
    /// 주어진 버전이 `[min_version, max_version]` 범위에 있는지 확인합니다.
    ///
    /// `8.0`처럼 패치 번호가 빠진 버전은 `.0`을 보충해 해석합니다.
    pub fn supports_version(&self, version: &str) -> Result<bool, semver::Error> {
        let v = parse_lenient(version)?;
        let min = parse_lenient(&self.min_version)?;
        let max = parse_lenient(&self.max_version)?;
        Ok(v >= min && v <= max)
    }

    /// 기능 지원 여부 (미등록 기능은 미지원)
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.get(capability).copied().unwrap_or(false)
    }
}

fn parse_lenient(version: &str) -> Result<semver::Version, semver::Error> {
    let trimmed = version.trim().trim_start_matches('v');
    let dots = trimmed.matches('.').count();
    let padded = match dots {
        0 => format!("{trimmed}.0.0"),
        1 => format!("{trimmed}.0"),
        _ => trimmed.to_owned(),
    };
    semver::Version::parse(&padded)
}

// ─── 경고 ───────────────────────────────────────────────────────────

/// 경고 수준 — 심각도 순으로 정렬됩니다 (`Info < Minor < Major`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Info,
    Minor,
    Major,
}

impl fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Minor => f.write_str("minor"),
            Self::Major => f.write_str("major"),
        }
    }
}

/// 검증 경고
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// 기계가 읽는 안정적인 코드 (예: `LOW_SPECIFICITY`)
    pub code: String,
    /// 사람이 읽는 설명
    pub message: String,
    /// 심각도
    pub level: WarningLevel,
}

impl Warning {
    pub fn new(code: impl Into<String>, message: impl Into<String>, level: WarningLevel) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            level,
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningLevel::Info)
    }

    pub fn minor(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningLevel::Minor)
    }

    pub fn major(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, WarningLevel::Major)
    }
}

// ─── 품질 지표 ──────────────────────────────────────────────────────

/// 성능 영향도 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceImpact {
    Low,
    Medium,
    High,
    /// 알 수 없는 값 (역직렬화 호환용, 점수 0.0)
    #[serde(other)]
    Unknown,
}

impl PerformanceImpact {
    /// 신뢰도 합성식에 쓰이는 성능 점수
    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 0.7,
            Self::High => 0.4,
            Self::Unknown => 0.0,
        }
    }
}

impl fmt::Display for PerformanceImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// 신뢰도 합성식: `0.6 × accuracy + 0.3 × (1 − fp) + 0.1 × perf`
///
/// 캐시된 결과 및 외부 대시보드와의 호환을 위해 가중치는 고정입니다.
pub fn confidence_score(accuracy: f64, false_positive_rate: f64, impact: PerformanceImpact) -> f64 {
    0.6 * accuracy + 0.3 * (1.0 - false_positive_rate) + 0.1 * impact.score()
}

/// 번역 결과 품질 지표
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// 정확도 (0–1)
    pub accuracy_score: f64,
    /// 오탐률 추정치 (0–1)
    pub false_positive_rate: f64,
    /// 성능 영향도
    pub performance_impact: PerformanceImpact,
    /// 합성 신뢰도 (0–1)
    pub confidence_score: f64,
    /// 검증 경고 (발생 순서 유지)
    pub validation_warnings: Vec<Warning>,
    /// 마지막 검증 시각
    pub last_validated: DateTime<Utc>,
}

impl QualityMetrics {
    /// 하위 점수로부터 지표를 구성합니다. 점수는 `[0, 1]`로 보정됩니다.
    pub fn new(
        accuracy: f64,
        false_positive_rate: f64,
        performance_impact: PerformanceImpact,
        validation_warnings: Vec<Warning>,
    ) -> Self {
        let accuracy_score = clamp_unit(accuracy);
        let false_positive_rate = clamp_unit(false_positive_rate);
        Self {
            accuracy_score,
            false_positive_rate,
            performance_impact,
            confidence_score: clamp_unit(confidence_score(
                accuracy_score,
                false_positive_rate,
                performance_impact,
            )),
            validation_warnings,
            last_validated: Utc::now(),
        }
    }

    /// 가장 높은 경고 수준
    pub fn max_warning_level(&self) -> Option<WarningLevel> {
        self.validation_warnings.iter().map(|w| w.level).max()
    }

    /// Major 경고가 하나라도 있는지 여부
    pub fn has_major_warnings(&self) -> bool {
        self.max_warning_level() == Some(WarningLevel::Major)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ─── UDF ────────────────────────────────────────────────────────────

/// 감사 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub version: String,
    /// 변경 이력 (순서 유지)
    #[serde(default)]
    pub change_log: Vec<String>,
}

/// 플랫폼 중립 탐지 규칙
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalFormat {
    /// 불투명 식별자 (버전 간 안정)
    pub id: String,
    /// 탐지 규칙 버전
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 정규 규칙 본문 (번역기만 해석)
    pub content: String,
    /// 원본 플랫폼 계열
    pub platform: PlatformFamily,
    /// 원본 플랫폼 메타데이터
    pub platform_specific_data: PlatformMetadata,
    /// 원본 규칙 품질 지표
    pub metrics: QualityMetrics,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub audit_trail: AuditInfo,
}

impl UniversalFormat {
    /// 구조적 무결성을 검사합니다.
    ///
    /// 본문이 비어 있거나 점수가 `[0, 1]` 범위를 벗어나면 사유를 반환합니다.
    pub fn check_well_formed(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("UDF content is empty".to_owned());
        }
        if self.id.trim().is_empty() {
            return Err("UDF id is empty".to_owned());
        }
        let scores = [
            ("accuracy_score", self.metrics.accuracy_score),
            ("false_positive_rate", self.metrics.false_positive_rate),
            ("confidence_score", self.metrics.confidence_score),
        ];
        for (name, score) in scores {
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("{name} {score} is outside [0, 1]"));
            }
        }
        if self.metrics.performance_impact == PerformanceImpact::Unknown {
            return Err("performance_impact must be low, medium or high".to_owned());
        }
        Ok(())
    }
}

// ─── 번역 결과 / 옵션 ───────────────────────────────────────────────

/// 번역 결과 — 생성 후 변경되지 않으며 핑거프린트로 캐시됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// 번역된 대상 플랫폼 콘텐츠
    pub content: String,
    pub quality_metrics: QualityMetrics,
    /// 렌더링 경고 + 검증 경고
    pub warnings: Vec<Warning>,
    pub translated_at: DateTime<Utc>,
    pub confidence_score: f64,
}

/// 번역 요청 옵션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationOptions {
    /// 전체 번역 제한 시간
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
    /// 플랫폼 튜닝 적극성 (0–3)
    pub optimization_level: u8,
    /// UDF 검증 실패 시 중단 여부
    pub strict_validation: bool,
    /// 외부 의존 단계 재시도 횟수
    pub retry_attempts: u32,
    /// 최적화 주석 포함 여부
    pub preserve_comments: bool,
    /// 대상 플랫폼 버전 (호환성 검사)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    /// 원본 콘텐츠 버전 (핑거프린트 구성 요소)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            optimization_level: 1,
            strict_validation: true,
            retry_attempts: 3,
            preserve_comments: false,
            target_version: None,
            source_version: None,
        }
    }
}

impl TranslationOptions {
    /// 렌더링 단계에 전달할 옵션만 추립니다.
    pub fn conversion(&self) -> ConversionOptions {
        ConversionOptions {
            optimization_level: self.optimization_level,
            preserve_comments: self.preserve_comments,
            target_version: self.target_version.clone(),
        }
    }
}

/// `FromUDF` 렌더링 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    pub optimization_level: u8,
    pub preserve_comments: bool,
    pub target_version: Option<String>,
}

/// `FromUDF` 렌더링 결과 — 콘텐츠와 렌더링 중 발생한 경고
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub content: String,
    pub warnings: Vec<Warning>,
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
