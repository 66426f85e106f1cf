//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진과 데몬은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `udfbridge_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(udfbridge_core::metrics::CACHE_HITS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 원본 플랫폼 레이블 키
pub const LABEL_SOURCE: &str = "source";

/// 대상 플랫폼 레이블 키
pub const LABEL_TARGET: &str = "target";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 에러 종류 레이블 키 (`TranslationError::kind`)
pub const LABEL_ERROR_TYPE: &str = "error_type";

/// 플랫폼 쌍 레이블 키 (`siem->edr`)
pub const LABEL_PAIR: &str = "pair";

// ─── 번역 엔진 메트릭 ──────────────────────────────────────────────

/// 번역 요청 수 (counter, label: source, target, result)
pub const TRANSLATIONS_TOTAL: &str = "udfbridge_translations_total";

/// 번역 소요 시간 (histogram, 초, label: source, target)
pub const TRANSLATION_DURATION_SECONDS: &str = "udfbridge_translation_duration_seconds";

/// 번역 에러 수 (counter, label: source, target, error_type)
pub const TRANSLATION_ERRORS_TOTAL: &str = "udfbridge_translation_errors_total";

/// 번역 결과 신뢰도 분포 (histogram, label: target)
pub const TRANSLATION_CONFIDENCE: &str = "udfbridge_translation_confidence";

/// 결과 캐시 적중 수 (counter)
pub const CACHE_HITS_TOTAL: &str = "udfbridge_cache_hits_total";

/// 중복 제거로 결과를 공유받은 요청 수 (counter)
pub const DEDUP_SHARED_TOTAL: &str = "udfbridge_dedup_shared_total";

/// 회로 차단기 상태 (gauge, 0=closed 1=half-open 2=open, label: pair)
pub const CIRCUIT_STATE: &str = "udfbridge_circuit_state";

/// 배치 요청 크기 (histogram)
pub const BATCH_SIZE: &str = "udfbridge_batch_size";

// ─── 데몬 메트릭 ────────────────────────────────────────────────────

/// 데몬 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "udfbridge_daemon_uptime_seconds";

/// 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "udfbridge_daemon_build_info";

/// 등록된 번역기 수 (gauge)
pub const DAEMON_TRANSLATORS_REGISTERED: &str = "udfbridge_daemon_translators_registered";

/// 번역 소요 시간 히스토그램 버킷 (초)
pub const TRANSLATION_DURATION_BUCKETS: &[f64] =
    &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0];

/// 모든 메트릭 이름
pub const ALL_METRIC_NAMES: &[&str] = &[
    TRANSLATIONS_TOTAL,
    TRANSLATION_DURATION_SECONDS,
    TRANSLATION_ERRORS_TOTAL,
    TRANSLATION_CONFIDENCE,
    CACHE_HITS_TOTAL,
    DEDUP_SHARED_TOTAL,
    CIRCUIT_STATE,
    BATCH_SIZE,
    DAEMON_UPTIME_SECONDS,
    DAEMON_BUILD_INFO,
    DAEMON_TRANSLATORS_REGISTERED,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 패닉하지 않습니다.
pub fn describe_all() {
    use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        TRANSLATIONS_TOTAL,
        Unit::Count,
        "Translation requests by platform pair and result"
    );
    describe_histogram!(
        TRANSLATION_DURATION_SECONDS,
        Unit::Seconds,
        "End-to-end translation latency"
    );
    describe_counter!(
        TRANSLATION_ERRORS_TOTAL,
        Unit::Count,
        "Translation failures by error type"
    );
    describe_histogram!(
        TRANSLATION_CONFIDENCE,
        "Confidence score of successful translations"
    );
    describe_counter!(
        CACHE_HITS_TOTAL,
        Unit::Count,
        "Translations served from the result cache"
    );
    describe_counter!(
        DEDUP_SHARED_TOTAL,
        Unit::Count,
        "Translations that awaited an identical in-flight request"
    );
    describe_gauge!(
        CIRCUIT_STATE,
        "Circuit breaker state per platform pair (0 closed, 1 half-open, 2 open)"
    );
    describe_histogram!(BATCH_SIZE, Unit::Count, "Requests per batch");
    describe_gauge!(
        DAEMON_UPTIME_SECONDS,
        Unit::Seconds,
        "Seconds since the daemon started"
    );
    describe_gauge!(DAEMON_BUILD_INFO, "Build information (always 1)");
    describe_gauge!(
        DAEMON_TRANSLATORS_REGISTERED,
        Unit::Count,
        "Number of registered platform translators"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_start_with_udfbridge_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("udfbridge_"),
                "Metric '{}' does not start with 'udfbridge_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names: Vec<&str> = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [
            LABEL_SOURCE,
            LABEL_TARGET,
            LABEL_RESULT,
            LABEL_ERROR_TYPE,
            LABEL_PAIR,
        ];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }

    #[test]
    fn duration_buckets_are_sorted() {
        let buckets = TRANSLATION_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
