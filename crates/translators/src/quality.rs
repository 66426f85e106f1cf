//! 품질 분석기 — 규칙 본문의 정확도, 오탐률, 성능 영향도 산출
//!
//! 정확도는 방언 적합성 검사([`Conformance`])에서, 오탐률은 조건 특이도에서,
//! 성능 영향도는 조건/단계 복잡도에서 계산합니다. 분석은 순수 함수이며
//! 같은 입력에 대해 항상 같은 점수를 냅니다.

use udfbridge_core::udf::{PerformanceImpact, QualityMetrics, Warning};

use crate::codes;
use crate::rule::{Condition, Operator, RuleBody};

/// 필수 필드 누락 또는 구조 패턴 불일치 시 감점
const STRUCTURAL_PENALTY: f64 = 0.25;
/// 설정 검증 규칙 위반 시 감점
const RULE_PENALTY: f64 = 0.1;
/// 오탐률 하한 (완전히 특이한 규칙)
const BASE_FALSE_POSITIVE: f64 = 0.01;
/// 특이도 부족분에 곱하는 오탐 가중치
const FALSE_POSITIVE_SLOPE: f64 = 0.6;
/// 복잡도 가산 없이 허용하는 조건 수
const FREE_CONDITIONS: usize = 8;
/// 복잡도 가중치 단위 (1.0 = 100)
const COMPLEXITY_SCALE: u32 = 100;
const REGEX_WEIGHT: u32 = 20;
/// 부분 문자열/와일드카드 스캔
const SCAN_WEIGHT: u32 = 10;
const CORRELATION_WEIGHT: u32 = 30;
const STAGE_WEIGHT: u32 = 10;
/// `FREE_CONDITIONS`를 넘는 조건 하나당
const EXTRA_CONDITION_WEIGHT: u32 = 5;
/// `Low` 영향도 상한 (미만)
const LOW_IMPACT_CEILING: f64 = 0.3;

/// 방언 적합성 검사 결과 — 감점이 누적된 정확도와 경고
#[derive(Debug, Clone, PartialEq)]
pub struct Conformance {
    accuracy: f64,
    warnings: Vec<Warning>,
}

impl Default for Conformance {
    fn default() -> Self {
        Self {
            accuracy: 1.0,
            warnings: Vec::new(),
        }
    }
}

impl Conformance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing_field(&mut self, field: &str) {
        self.penalize(
            STRUCTURAL_PENALTY,
            Warning::major(
                codes::MISSING_REQUIRED_FIELD,
                format!("required field '{field}' is missing"),
            ),
        );
    }

    pub fn syntax_violation(&mut self, pattern: &str) {
        self.penalize(
            STRUCTURAL_PENALTY,
            Warning::major(
                codes::INVALID_SYNTAX,
                format!("content does not match structural pattern '{pattern}'"),
            ),
        );
    }

    pub fn rule_violation(&mut self, rule: &str) {
        self.penalize(
            RULE_PENALTY,
            Warning::major(
                codes::CONFIG_RULE_VIOLATION,
                format!("content violates configured validation rule '{rule}'"),
            ),
        );
    }

    /// 감점 없는 경고를 덧붙입니다.
    pub fn note(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    fn penalize(&mut self, penalty: f64, warning: Warning) {
        self.accuracy = (self.accuracy - penalty).max(0.0);
        self.warnings.push(warning);
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// 품질 분석기 설정
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityAnalyzer {
    /// 이 값 미만의 특이도는 `LOW_SPECIFICITY` 경고
    pub specificity_floor: f64,
    /// 이 값을 넘는 복잡도는 `HIGH_COMPLEXITY` 경고
    pub complexity_threshold: f64,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self {
            specificity_floor: 0.5,
            complexity_threshold: 0.7,
        }
    }
}

impl QualityAnalyzer {
    /// 조건 하나의 특이도 점수
    pub fn condition_specificity(condition: &Condition) -> f64 {
        if condition.is_match_all() {
            0.0
        } else if condition.operator == Operator::NotEquals {
            0.3
        } else if condition.has_inner_wildcard() {
            0.4
        } else if condition.value.chars().count() < 3 {
            0.5
        } else if condition.operator == Operator::Regex {
            0.7
        } else {
            1.0
        }
    }

    /// 조건 특이도 평균 (조건이 없으면 0)
    pub fn specificity(&self, body: &RuleBody) -> f64 {
        if body.conditions.is_empty() {
            return 0.0;
        }
        let total: f64 = body
            .conditions
            .iter()
            .map(Self::condition_specificity)
            .sum();
        total / body.conditions.len() as f64
    }

    /// 규칙 복잡도 (0–1)
    ///
    /// 가중치는 정수 백분율로 합산한 뒤 한 번만 나눕니다.
    pub fn complexity(&self, body: &RuleBody) -> f64 {
        let conditions: u32 = body
            .conditions
            .iter()
            .map(|c| match c.operator {
                Operator::Regex => REGEX_WEIGHT,
                Operator::Contains | Operator::EndsWith => SCAN_WEIGHT,
                _ if c.has_inner_wildcard() => SCAN_WEIGHT,
                _ => 0,
            })
            .sum();
        let stages: u32 = body
            .stages
            .iter()
            .map(|s| {
                if s.is_correlation() {
                    CORRELATION_WEIGHT
                } else {
                    STAGE_WEIGHT
                }
            })
            .sum();
        let extra = u32::try_from(body.conditions.len().saturating_sub(FREE_CONDITIONS))
            .unwrap_or(u32::MAX)
            .saturating_mul(EXTRA_CONDITION_WEIGHT);
        let total = conditions
            .saturating_add(stages)
            .saturating_add(extra)
            .min(COMPLEXITY_SCALE);
        f64::from(total) / f64::from(COMPLEXITY_SCALE)
    }

    /// 복잡도를 성능 영향도로 분류합니다.
    pub fn impact(&self, complexity: f64) -> PerformanceImpact {
        if complexity < LOW_IMPACT_CEILING {
            PerformanceImpact::Low
        } else if complexity <= self.complexity_threshold {
            PerformanceImpact::Medium
        } else {
            PerformanceImpact::High
        }
    }

    /// 적합성 검사 결과와 규칙 본문으로 품질 지표를 만듭니다.
    pub fn assess(&self, body: &RuleBody, conformance: Conformance) -> QualityMetrics {
        let Conformance {
            accuracy,
            mut warnings,
        } = conformance;

        let specificity = self.specificity(body);
        if specificity < self.specificity_floor {
            warnings.push(Warning::major(
                codes::LOW_SPECIFICITY,
                format!(
                    "rule specificity {specificity:.2} is below {:.2}; expect false positives",
                    self.specificity_floor
                ),
            ));
        }
        let false_positive_rate =
            BASE_FALSE_POSITIVE + FALSE_POSITIVE_SLOPE * (1.0 - specificity);

        let complexity = self.complexity(body);
        if complexity > self.complexity_threshold {
            warnings.push(Warning::major(
                codes::HIGH_COMPLEXITY,
                format!(
                    "rule complexity {complexity:.2} exceeds {:.2}",
                    self.complexity_threshold
                ),
            ));
        }

        QualityMetrics::new(accuracy, false_positive_rate, self.impact(complexity), warnings)
    }
}
