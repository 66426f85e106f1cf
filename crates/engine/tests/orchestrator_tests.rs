//! 오케스트레이터 통합 테스트
//!
//! 실제 번역기 레지스트리 위에서 캐시, 중복 제거, 회로 차단기, 제한 시간,
//! 배치 처리, 정확도 하한을 검증합니다. 실행 횟수 관찰이 필요한 경우
//! 기존 번역기를 [`Instrumented`]로 감싸 등록합니다.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use udfbridge_core::config::{PlatformConfig, UdfBridgeConfig};
use udfbridge_core::error::TranslationError;
use udfbridge_core::health::HealthStatus;
use udfbridge_core::translator::{BoxFuture, Translator};
use udfbridge_core::udf::{
    ConversionOptions, PerformanceImpact, PlatformFamily, PlatformMetadata, QualityMetrics,
    Rendition, TranslationOptions, UniversalFormat, Warning, WarningLevel,
};
use udfbridge_engine::codes;
use udfbridge_engine::{
    BatchRequest, CircuitState, RemoteValidator, RequestOptions, TranslationOrchestrator,
};
use udfbridge_translators::TranslatorRegistry;

const SNORT_RULE: &str =
    r#"alert tcp any any -> any any (msg:"Test"; content:"malicious"; sid:1000001;)"#;

// ─── 테스트 보조 ───────────────────────────────────────────────────

/// 호출 횟수를 세고, 지연이나 패닉을 주입하는 번역기 래퍼
struct Instrumented {
    inner: Arc<dyn Translator>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
    panics: bool,
}

impl Translator for Instrumented {
    fn platform(&self) -> &str {
        self.inner.platform()
    }

    fn family(&self) -> PlatformFamily {
        self.inner.family()
    }

    fn metadata(&self) -> &PlatformMetadata {
        self.inner.metadata()
    }

    fn to_udf(&self, raw: &str) -> Result<UniversalFormat, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("injected translator panic");
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.to_udf(raw)
    }

    fn from_udf(
        &self,
        udf: &UniversalFormat,
        options: &ConversionOptions,
    ) -> Result<Rendition, TranslationError> {
        self.inner.from_udf(udf, options)
    }

    fn validate_content(&self, content: &str) -> Result<QualityMetrics, TranslationError> {
        self.inner.validate_content(content)
    }
}

/// `platform` 번역기를 계측 래퍼로 교체한 오케스트레이터와 호출 카운터
fn instrumented(
    platform: &str,
    delay: Duration,
    panics: bool,
) -> (TranslationOrchestrator, Arc<AtomicUsize>) {
    let mut registry = TranslatorRegistry::with_defaults().expect("registry should build");
    let calls = Arc::new(AtomicUsize::new(0));
    let inner = registry.get(platform).expect("platform should be registered");
    registry.register(Arc::new(Instrumented {
        inner,
        calls: Arc::clone(&calls),
        delay,
        panics,
    }));
    let orchestrator = TranslationOrchestrator::builder()
        .registry(registry)
        .build()
        .expect("orchestrator should build");
    (orchestrator, calls)
}

fn orchestrator() -> TranslationOrchestrator {
    TranslationOrchestrator::builder()
        .build()
        .expect("default orchestrator should build")
}

fn batch_request(id: &str, content: &str, target: &str) -> BatchRequest {
    BatchRequest {
        request_id: id.to_owned(),
        content: content.to_owned(),
        source_platform: "snort".to_owned(),
        target_platform: target.to_owned(),
        options: RequestOptions::default(),
    }
}

// ─── 단일 번역 ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_example_scenario_siem_to_edr() {
    let orchestrator = orchestrator();

    // Given: 엄격 검증이 켜진 기본 옵션
    let options = TranslationOptions::default();
    assert!(options.strict_validation);

    // When
    let result = orchestrator
        .translate(SNORT_RULE, "SIEM", "EDR", options)
        .await
        .expect("example translation should succeed");

    // Then
    assert!(result.confidence_score >= 0.95);
    assert!(result.quality_metrics.false_positive_rate < 0.05);
    assert!((result.confidence_score - 0.997).abs() < 1e-9);
    assert!(result.content.contains("malicious"));
}

#[tokio::test]
async fn test_unsupported_platform_does_no_work() {
    let (orchestrator, calls) = instrumented("siem", Duration::ZERO, false);

    let err = orchestrator
        .translate(SNORT_RULE, "SIEM", "UNKNOWN", TranslationOptions::default())
        .await
        .expect_err("unknown target should fail");

    match err {
        TranslationError::UnsupportedPlatform { platform } => assert_eq!(platform, "UNKNOWN"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.circuits().is_empty());
    assert_eq!(orchestrator.stats().failure_count, 1);
}

#[tokio::test]
async fn test_translation_is_deterministic_across_instances() {
    let options = TranslationOptions {
        optimization_level: 2,
        ..TranslationOptions::default()
    };
    let first = orchestrator()
        .translate(SNORT_RULE, "snort", "suricata", options.clone())
        .await
        .expect("should translate");
    let second = orchestrator()
        .translate(SNORT_RULE, "snort", "suricata", options)
        .await
        .expect("should translate");

    assert_eq!(first.content, second.content);
    assert_eq!(first.confidence_score, second.confidence_score);
    assert_eq!(first.warnings, second.warnings);
}

#[tokio::test]
async fn test_concurrent_identical_requests_run_once() {
    // Given: 파싱에 150ms가 걸리는 원본 번역기
    let (orchestrator, calls) = instrumented("siem", Duration::from_millis(150), false);

    // When: 같은 요청 두 개를 동시에 실행
    let (a, b) = tokio::join!(
        orchestrator.translate(SNORT_RULE, "siem", "edr", TranslationOptions::default()),
        orchestrator.translate(SNORT_RULE, "siem", "edr", TranslationOptions::default()),
    );

    // Then: 번역기는 한 번만 실행되고 두 호출자는 같은 결과를 받음
    let a = a.expect("leader should succeed");
    let b = b.expect("follower should receive the leader's result");
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = orchestrator.stats();
    assert_eq!(stats.total_operations, 2);
    assert_eq!(stats.dedup_shared, 1);
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_failures() {
    let (orchestrator, calls) = instrumented("snort", Duration::ZERO, false);

    // Given: 같은 쌍에서 10번 연속 파싱 실패
    for i in 0..10 {
        let err = orchestrator
            .translate(
                &format!("garbage input {i}"),
                "snort",
                "suricata",
                TranslationOptions::default(),
            )
            .await
            .expect_err("garbage should fail");
        assert!(matches!(err, TranslationError::Parse { .. }));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 10);

    // When: 정상 입력으로 다시 호출
    let err = orchestrator
        .translate(SNORT_RULE, "snort", "suricata", TranslationOptions::default())
        .await
        .expect_err("open circuit should fail fast");

    // Then: 번역기를 호출하지 않고 즉시 거부
    assert!(matches!(err, TranslationError::CircuitOpen { ref pair, .. } if pair == "snort->suricata"));
    assert!(err.is_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 10);

    let circuits = orchestrator.circuits();
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0].state, CircuitState::Open);
    assert!(matches!(orchestrator.health(), HealthStatus::Degraded(_)));

    // 다른 쌍은 영향 없음
    orchestrator
        .translate(SNORT_RULE, "snort", "zeek", TranslationOptions::default())
        .await
        .expect("other pair should still translate");
}

#[tokio::test]
async fn test_timed_out_leader_releases_waiters() {
    let (orchestrator, calls) = instrumented("siem", Duration::from_millis(400), false);
    let short = TranslationOptions {
        timeout: Duration::from_millis(50),
        ..TranslationOptions::default()
    };

    // When: 리더와 팔로워 모두 짧은 제한 시간
    let (a, b) = tokio::join!(
        orchestrator.translate(SNORT_RULE, "siem", "edr", short.clone()),
        orchestrator.translate(SNORT_RULE, "siem", "edr", short),
    );

    // Then: 둘 다 제한 시간 에러, 무한 대기 없음
    assert!(matches!(a, Err(TranslationError::Timeout { elapsed_ms: 50 })));
    assert!(matches!(b, Err(TranslationError::Timeout { .. })));
    assert_eq!(orchestrator.cached_results(), 0);

    // 중복 제거 항목이 해제되어 다음 요청이 새 리더가 됨
    let result = orchestrator
        .translate(SNORT_RULE, "siem", "edr", TranslationOptions::default())
        .await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_strict_mode_still_translates() {
    let orchestrator = orchestrator();
    let options = TranslationOptions {
        strict_validation: false,
        preserve_comments: true,
        ..TranslationOptions::default()
    };
    let result = orchestrator
        .translate(SNORT_RULE, "snort", "suricata", options)
        .await
        .expect("should translate");
    assert!(result.content.starts_with("alert tcp"));
    assert!(!result.warnings.iter().any(|w| w.code == codes::UDF_INVALID));
}

/// 성능 영향도가 `Unknown`인 UDF를 내보내는 원본 번역기 래퍼
struct MalformedUdf {
    inner: Arc<dyn Translator>,
}

impl Translator for MalformedUdf {
    fn platform(&self) -> &str {
        self.inner.platform()
    }

    fn family(&self) -> PlatformFamily {
        self.inner.family()
    }

    fn metadata(&self) -> &PlatformMetadata {
        self.inner.metadata()
    }

    fn to_udf(&self, raw: &str) -> Result<UniversalFormat, TranslationError> {
        let mut udf = self.inner.to_udf(raw)?;
        udf.metrics.performance_impact = PerformanceImpact::Unknown;
        Ok(udf)
    }

    fn from_udf(
        &self,
        udf: &UniversalFormat,
        options: &ConversionOptions,
    ) -> Result<Rendition, TranslationError> {
        self.inner.from_udf(udf, options)
    }

    fn validate_content(&self, content: &str) -> Result<QualityMetrics, TranslationError> {
        self.inner.validate_content(content)
    }
}

fn malformed_udf_orchestrator() -> TranslationOrchestrator {
    let mut registry = TranslatorRegistry::with_defaults().expect("registry should build");
    let inner = registry.get("snort").expect("snort should be registered");
    registry.register(Arc::new(MalformedUdf { inner }));
    TranslationOrchestrator::builder()
        .registry(registry)
        .build()
        .expect("orchestrator should build")
}

#[tokio::test]
async fn test_strict_mode_rejects_malformed_udf() {
    // Given: 원본 번역기가 구조적으로 잘못된 UDF를 반환
    let orchestrator = malformed_udf_orchestrator();

    // When: 엄격 검증으로 번역
    let err = orchestrator
        .translate(SNORT_RULE, "snort", "suricata", TranslationOptions::default())
        .await
        .expect_err("strict mode should reject a malformed UDF");

    // Then: 원본 플랫폼 이름이 담긴 검증 오류
    match err {
        TranslationError::Validation { platform, reason } => {
            assert_eq!(platform, "snort");
            assert!(reason.contains("performance_impact"), "got: {}", reason);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_strict_mode_warns_on_malformed_udf() {
    // Given
    let orchestrator = malformed_udf_orchestrator();
    let options = TranslationOptions {
        strict_validation: false,
        ..TranslationOptions::default()
    };

    // When
    let result = orchestrator
        .translate(SNORT_RULE, "snort", "suricata", options)
        .await
        .expect("non-strict mode should translate a malformed UDF");

    // Then: 번역은 계속되고 Major UDF_INVALID 경고가 붙음
    assert!(result.content.starts_with("alert tcp"));
    let warning = result
        .warnings
        .iter()
        .find(|w| w.code == codes::UDF_INVALID)
        .expect("should carry a UDF_INVALID warning");
    assert_eq!(warning.level, WarningLevel::Major);
}

// ─── 정확도 하한 ───────────────────────────────────────────────────

fn config_with_edr_rule(floor: Option<f64>) -> UdfBridgeConfig {
    let mut config = UdfBridgeConfig::default();
    config.platforms.insert(
        "edr".to_owned(),
        PlatformConfig {
            validation_rules: BTreeMap::from([(
                "host_scoped".to_owned(),
                "ComputerName".to_owned(),
            )]),
            accuracy_floor: floor,
            ..PlatformConfig::default()
        },
    );
    config
}

#[tokio::test]
async fn test_accuracy_below_floor_returns_result_with_error() {
    let orchestrator = TranslationOrchestrator::builder()
        .config(config_with_edr_rule(None))
        .build()
        .expect("should build");

    let err = orchestrator
        .translate(SNORT_RULE, "snort", "edr", TranslationOptions::default())
        .await
        .expect_err("rule violation should push accuracy below 0.99");

    match &err {
        TranslationError::AccuracyThreshold {
            platform,
            accuracy,
            floor,
            ..
        } => {
            assert_eq!(platform, "edr");
            assert!((accuracy - 0.9).abs() < 1e-9);
            assert!((floor - 0.99).abs() < 1e-9);
        }
        other => panic!("unexpected error: {other}"),
    }
    let partial = err.partial_result().expect("result should be attached");
    assert!(partial.warnings.iter().any(|w| w.code == "CONFIG_RULE_VIOLATION"));
    assert!(!err.is_retryable());
    assert_eq!(orchestrator.cached_results(), 0);
}

#[tokio::test]
async fn test_platform_floor_override_accepts_result() {
    let orchestrator = TranslationOrchestrator::builder()
        .config(config_with_edr_rule(Some(0.8)))
        .build()
        .expect("should build");

    let result = orchestrator
        .translate(SNORT_RULE, "snort", "edr", TranslationOptions::default())
        .await
        .expect("lowered floor should accept the result");
    assert!((result.quality_metrics.accuracy_score - 0.9).abs() < 1e-9);
}

// ─── 원격 검증 ─────────────────────────────────────────────────────

struct Unreachable {
    calls: AtomicUsize,
}

impl RemoteValidator for Unreachable {
    fn validate<'a>(
        &'a self,
        _platform: &'a str,
        _content: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Warning>, String>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".to_owned())
        })
    }
}

#[tokio::test]
async fn test_unreachable_remote_validator_only_warns() {
    let mut config = UdfBridgeConfig::default();
    let mut edr = PlatformConfig::default();
    edr.retry_policy.initial_interval_ms = 1;
    edr.retry_policy.max_interval_ms = 5;
    config.platforms.insert("edr".to_owned(), edr);

    let remote = Arc::new(Unreachable {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = TranslationOrchestrator::builder()
        .config(config)
        .remote_validator(remote.clone())
        .build()
        .expect("should build");

    let result = orchestrator
        .translate(SNORT_RULE, "siem", "edr", TranslationOptions::default())
        .await
        .expect("remote failure must not fail the translation");

    assert_eq!(remote.calls.load(Ordering::SeqCst), 3);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.code == codes::REMOTE_VALIDATION_UNAVAILABLE));
}

// ─── 배치 ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_partial_failure() {
    let orchestrator = orchestrator();
    let requests = vec![
        batch_request("r1", SNORT_RULE, "edr"),
        batch_request("r2", "", "edr"),
        batch_request("r3", SNORT_RULE, "suricata"),
        batch_request("r4", SNORT_RULE, "siem"),
        batch_request("r5", "   ", "zeek"),
        batch_request("r6", SNORT_RULE, "snort"),
    ];

    let result = orchestrator.translate_batch(requests).await;

    assert_eq!(result.len(), 6);
    assert_eq!(result.success_count, 4);
    assert_eq!(result.failure_count, 2);
    for item in &result.items {
        match item.request_id.as_str() {
            "r2" | "r5" => assert!(matches!(
                item.outcome,
                Err(TranslationError::InvalidInput { .. })
            )),
            id => assert!(item.outcome.is_ok(), "{id} should succeed"),
        }
    }
}

#[tokio::test]
async fn test_batch_assigns_missing_ids_and_isolates_panics() {
    let (orchestrator, _) = instrumented("nsm", Duration::ZERO, true);
    let mut requests = vec![
        batch_request("", SNORT_RULE, "edr"),
        batch_request("ok", SNORT_RULE, "suricata"),
    ];
    requests.push(BatchRequest {
        source_platform: "nsm".to_owned(),
        ..batch_request("boom", SNORT_RULE, "edr")
    });

    let result = orchestrator.translate_batch(requests).await;

    assert_eq!(result.len(), 3);
    assert!(result.items[0].request_id.starts_with("req-"));
    assert!(result.items[0].outcome.is_ok());
    assert!(result.items[1].outcome.is_ok());
    assert_eq!(result.items[2].request_id, "boom");
    assert!(matches!(
        result.items[2].outcome,
        Err(TranslationError::Internal(_))
    ));
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
}

#[tokio::test]
async fn test_batch_respects_worker_pool_size() {
    let mut config = UdfBridgeConfig::default();
    config.engine.worker_pool_size = 2;
    let orchestrator = TranslationOrchestrator::builder()
        .config(config)
        .build()
        .expect("should build");

    let requests = (0..8)
        .map(|i| {
            let rule = format!(
                r#"alert tcp any any -> any {port} (msg:"Batch {i}"; content:"needle{i}"; sid:{sid};)"#,
                port = 1000 + i,
                sid = 2000000 + i,
            );
            batch_request(&format!("r{i}"), &rule, "suricata")
        })
        .collect();

    let result = orchestrator.translate_batch(requests).await;
    assert_eq!(result.success_count, 8);
    assert_eq!(orchestrator.stats().total_operations, 8);
}
