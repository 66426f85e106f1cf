//! 번역 오케스트레이터
//!
//! 번역 요청 하나의 처리 순서:
//!
//! 1. 입력 검증 (작업 시작 전 거부)
//! 2. 원본/대상 번역기 조회 (회로 차단기 집계 대상 아님)
//! 3. 결과 캐시 조회
//! 4. 플랫폼 쌍 회로 차단기 진입
//! 5. 같은 핑거프린트의 동시 요청 중 리더만 파이프라인 실행
//!    (blocking 풀, 제한 시간 적용)
//! 6. 회로 차단기에 결과 기록
//! 7. 성공 결과는 캐시에 넣은 뒤 팔로워에게 발행
//!
//! 캐시, 중복 제거 맵, 회로 카운터는 오케스트레이터 인스턴스가 소유하므로
//! 테스트마다 새 인스턴스로 격리할 수 있습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use udfbridge_core::config::UdfBridgeConfig;
use udfbridge_core::error::TranslationError;
use udfbridge_core::health::HealthStatus;
use udfbridge_core::metrics as m;
use udfbridge_core::translator::Translator;
use udfbridge_core::udf::{
    QualityMetrics, TranslationOptions, TranslationResult, Warning, WarningLevel,
    confidence_score,
};
use udfbridge_translators::TranslatorRegistry;

use crate::breaker::{CircuitBreakers, CircuitSnapshot};
use crate::cache::ResultCache;
use crate::codes;
use crate::error::EngineError;
use crate::fingerprint::Fingerprint;
use crate::flight::{Flight, SingleFlight};
use crate::remote::{RemoteValidator, validate_with_retry};
use crate::stats::{EngineStats, StatsSnapshot};

/// 최적화 수준 상한
pub const MAX_OPTIMIZATION_LEVEL: u8 = 3;

/// 등록되지 않은 플랫폼의 메트릭 레이블
const UNKNOWN_LABEL: &str = "unknown";

type Outcome = Result<TranslationResult, TranslationError>;

/// 검증 전용 호출 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub platform: String,
    /// 해석에 실패하면 `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,
    /// 요약 경고 (`VALIDATION_SUCCESS`, `VALIDATION_DEGRADED`, `VALIDATION_FAILED`)
    pub summary: Warning,
}

/// 파이프라인 중간 결과 (정확도 하한 검사 전)
struct Draft {
    content: String,
    metrics: QualityMetrics,
    warnings: Vec<Warning>,
}

pub(crate) struct Inner {
    pub(crate) config: UdfBridgeConfig,
    registry: TranslatorRegistry,
    cache: ResultCache,
    flights: SingleFlight<Fingerprint, Outcome>,
    breakers: CircuitBreakers,
    stats: EngineStats,
    remote: Option<Arc<dyn RemoteValidator>>,
}

/// 번역 오케스트레이터
///
/// 내부 상태는 `Arc`로 공유되므로 복제 비용이 낮고, 복제본은 같은 캐시와
/// 회로 차단기를 봅니다.
#[derive(Clone)]
pub struct TranslationOrchestrator {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for TranslationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationOrchestrator")
            .field("registry", &self.inner.registry)
            .field("cached", &self.inner.cache.len())
            .field("in_flight", &self.inner.flights.in_flight())
            .finish()
    }
}

impl TranslationOrchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// 규칙 하나를 원본 플랫폼에서 대상 플랫폼으로 번역합니다.
    pub async fn translate(
        &self,
        content: &str,
        source: &str,
        target: &str,
        options: TranslationOptions,
    ) -> Outcome {
        let started = Instant::now();
        let outcome = self.run(content, source, target, &options).await;
        let elapsed = started.elapsed();
        self.inner.stats.record(outcome.is_ok(), elapsed);
        self.emit_metrics(source, target, &outcome, elapsed);
        outcome
    }

    async fn run(
        &self,
        content: &str,
        source: &str,
        target: &str,
        options: &TranslationOptions,
    ) -> Outcome {
        check_request(content, source, target, options)?;
        let source_translator = self.resolve(source)?;
        let target_translator = self.resolve(target)?;

        let key = Fingerprint::compute(content, source, target, options);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let pair = CircuitBreakers::pair_key(
            source_translator.platform(),
            target_translator.platform(),
        );
        let permit = self.inner.breakers.admit(&pair)?;
        if permit.is_trial() {
            debug!(pair = %pair, "half-open circuit admitted trial request");
        }

        match self.inner.flights.join(key) {
            Flight::Follower(follower) => {
                drop(permit);
                debug!(fingerprint = %key.short(), pair = %pair, "waiting for in-flight translation");
                match tokio::time::timeout(options.timeout, follower.wait()).await {
                    Ok(Some(outcome)) => {
                        self.inner.stats.record_dedup_shared();
                        metrics::counter!(m::DEDUP_SHARED_TOTAL).increment(1);
                        outcome
                    }
                    Ok(None) | Err(_) => Err(timeout_error(options.timeout)),
                }
            }
            Flight::Leader(leader) => {
                // 조회와 참여 사이에 이전 리더가 끝났을 수 있음
                if let Some(hit) = self.cached(&key) {
                    leader.publish(Ok(hit.clone()));
                    return Ok(hit);
                }

                let outcome = match tokio::time::timeout(
                    options.timeout,
                    self.execute(source_translator, target_translator, content, options),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(
                            pair = %pair,
                            timeout_ms = options.timeout.as_millis() as u64,
                            "translation timed out"
                        );
                        Err(timeout_error(options.timeout))
                    }
                };

                permit.record(outcome.is_ok());
                if let Ok(result) = &outcome {
                    self.inner.cache.insert(key, result.clone());
                }
                leader.publish(outcome.clone());
                outcome
            }
        }
    }

    /// 파이프라인 본체: 변환은 blocking 풀에서, 원격 검증은 비동기로 수행합니다.
    async fn execute(
        &self,
        source: Arc<dyn Translator>,
        target: Arc<dyn Translator>,
        content: &str,
        options: &TranslationOptions,
    ) -> Outcome {
        let worker_target = Arc::clone(&target);
        let owned_content = content.to_owned();
        let worker_options = options.clone();
        let mut draft = tokio::task::spawn_blocking(move || {
            run_pipeline(
                source.as_ref(),
                worker_target.as_ref(),
                &owned_content,
                &worker_options,
            )
        })
        .await
        .map_err(|e| TranslationError::Internal(format!("translation worker failed: {e}")))??;

        if let Some(remote) = &self.inner.remote {
            let policy = self
                .inner
                .config
                .platform(target.platform())
                .map(|p| p.retry_policy.clone())
                .unwrap_or_default();
            let remote_warnings = validate_with_retry(
                remote.as_ref(),
                target.platform(),
                &draft.content,
                options.retry_attempts,
                &policy,
            )
            .await;
            draft.warnings.extend(remote_warnings);
        }

        self.finalize(target.platform(), draft)
    }

    /// 정확도 하한을 적용하고 결과를 조립합니다.
    fn finalize(&self, target: &str, draft: Draft) -> Outcome {
        let floor = self.inner.config.accuracy_floor_for(target);
        let metrics = draft.metrics;
        let confidence = confidence_score(
            metrics.accuracy_score,
            metrics.false_positive_rate,
            metrics.performance_impact,
        );
        let accuracy = metrics.accuracy_score;
        let result = TranslationResult {
            content: draft.content,
            quality_metrics: metrics,
            warnings: draft.warnings,
            translated_at: Utc::now(),
            confidence_score: confidence,
        };

        if accuracy < floor {
            debug!(platform = target, accuracy, floor, "accuracy below floor");
            return Err(TranslationError::AccuracyThreshold {
                platform: target.to_owned(),
                accuracy,
                floor,
                result: Box::new(result),
            });
        }
        Ok(result)
    }

    /// 번역 없이 콘텐츠를 대상 플랫폼 문법으로 검증합니다.
    ///
    /// 캐시, 회로 차단기, 통계를 건드리지 않습니다.
    pub fn validate(
        &self,
        content: &str,
        target: &str,
    ) -> Result<ValidationReport, TranslationError> {
        if content.trim().is_empty() {
            return Err(TranslationError::invalid_input("content", "must not be empty"));
        }
        if target.trim().is_empty() {
            return Err(TranslationError::invalid_input(
                "target_platform",
                "must not be empty",
            ));
        }
        let translator = self.resolve(target)?;
        let platform = translator.platform().to_owned();

        let report = match translator.validate_content(content) {
            Ok(metrics) => {
                let summary = if metrics.has_major_warnings() {
                    let majors = metrics
                        .validation_warnings
                        .iter()
                        .filter(|w| w.level == WarningLevel::Major)
                        .count();
                    Warning::minor(
                        codes::VALIDATION_DEGRADED,
                        format!(
                            "Validation found {majors} major issue(s) with confidence score: {:.2}",
                            metrics.confidence_score
                        ),
                    )
                } else {
                    Warning::info(
                        codes::VALIDATION_SUCCESS,
                        format!(
                            "Validation passed with confidence score: {:.2}",
                            metrics.confidence_score
                        ),
                    )
                };
                ValidationReport {
                    platform,
                    metrics: Some(metrics),
                    summary,
                }
            }
            Err(e) => ValidationReport {
                platform,
                metrics: None,
                summary: Warning::major(codes::VALIDATION_FAILED, e.to_string()),
            },
        };
        Ok(report)
    }

    // ─── 조회 ──────────────────────────────────────────────────────

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn circuits(&self) -> Vec<CircuitSnapshot> {
        self.inner.breakers.snapshots()
    }

    /// 열린 회로가 있으면 `Degraded`
    pub fn health(&self) -> HealthStatus {
        if self.inner.registry.is_empty() {
            return HealthStatus::Unhealthy("no translators registered".to_owned());
        }
        let open = self.inner.breakers.open_pairs();
        if open.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded(format!("circuit open: {}", open.join(", ")))
        }
    }

    pub fn registry(&self) -> &TranslatorRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &UdfBridgeConfig {
        &self.inner.config
    }

    /// 요청이 옵션을 생략했을 때 적용할 옵션
    pub fn default_options(&self) -> TranslationOptions {
        self.inner.config.engine.default_options()
    }

    /// 캐시된 결과 수
    pub fn cached_results(&self) -> usize {
        self.inner.cache.len()
    }

    /// 캐시 최대 항목 수
    pub fn cache_capacity(&self) -> usize {
        self.inner.cache.capacity()
    }

    // ─── 내부 ──────────────────────────────────────────────────────

    fn resolve(&self, platform: &str) -> Result<Arc<dyn Translator>, TranslationError> {
        self.inner
            .registry
            .get(platform)
            .map_err(|_| TranslationError::UnsupportedPlatform {
                platform: platform.to_owned(),
            })
    }

    fn cached(&self, key: &Fingerprint) -> Option<TranslationResult> {
        let hit = self.inner.cache.get(key)?;
        self.inner.stats.record_cache_hit();
        metrics::counter!(m::CACHE_HITS_TOTAL).increment(1);
        debug!(fingerprint = %key.short(), "translation cache hit");
        Some(hit)
    }

    fn label(&self, platform: &str) -> String {
        self.inner
            .registry
            .get(platform)
            .map_or_else(|_| UNKNOWN_LABEL.to_owned(), |t| t.platform().to_owned())
    }

    fn emit_metrics(&self, source: &str, target: &str, outcome: &Outcome, elapsed: Duration) {
        let source = self.label(source);
        let target = self.label(target);
        let result = if outcome.is_ok() { "success" } else { "failure" };

        metrics::counter!(
            m::TRANSLATIONS_TOTAL,
            m::LABEL_SOURCE => source.clone(),
            m::LABEL_TARGET => target.clone(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        metrics::histogram!(
            m::TRANSLATION_DURATION_SECONDS,
            m::LABEL_SOURCE => source.clone(),
            m::LABEL_TARGET => target.clone()
        )
        .record(elapsed.as_secs_f64());

        match outcome {
            Ok(result) => {
                metrics::histogram!(m::TRANSLATION_CONFIDENCE, m::LABEL_TARGET => target)
                    .record(result.confidence_score);
            }
            Err(e) => {
                metrics::counter!(
                    m::TRANSLATION_ERRORS_TOTAL,
                    m::LABEL_SOURCE => source,
                    m::LABEL_TARGET => target,
                    m::LABEL_ERROR_TYPE => e.kind()
                )
                .increment(1);
            }
        }
    }
}

/// 작업 시작 전 입력 검증
fn check_request(
    content: &str,
    source: &str,
    target: &str,
    options: &TranslationOptions,
) -> Result<(), TranslationError> {
    if content.trim().is_empty() {
        return Err(TranslationError::invalid_input("content", "must not be empty"));
    }
    if source.trim().is_empty() {
        return Err(TranslationError::invalid_input(
            "source_platform",
            "must not be empty",
        ));
    }
    if target.trim().is_empty() {
        return Err(TranslationError::invalid_input(
            "target_platform",
            "must not be empty",
        ));
    }
    if options.timeout.is_zero() {
        return Err(TranslationError::invalid_input(
            "timeout",
            "must be greater than 0",
        ));
    }
    if options.optimization_level > MAX_OPTIMIZATION_LEVEL {
        return Err(TranslationError::invalid_input(
            "optimization_level",
            format!("must be within 0..={MAX_OPTIMIZATION_LEVEL}"),
        ));
    }
    Ok(())
}

fn timeout_error(timeout: Duration) -> TranslationError {
    TranslationError::Timeout {
        elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// 변환 단계 (동기): ToUDF → UDF 검사 → FromUDF → ValidateContent
fn run_pipeline(
    source: &dyn Translator,
    target: &dyn Translator,
    content: &str,
    options: &TranslationOptions,
) -> Result<Draft, TranslationError> {
    let udf = source.to_udf(content)?;

    let mut warnings = Vec::new();
    if let Err(reason) = udf.check_well_formed() {
        if options.strict_validation {
            return Err(TranslationError::Validation {
                platform: source.platform().to_owned(),
                reason,
            });
        }
        warnings.push(Warning::major(codes::UDF_INVALID, reason));
    }

    let rendition = target.from_udf(&udf, &options.conversion())?;
    warnings.extend(rendition.warnings);

    let metrics = target.validate_content(&rendition.content)?;
    warnings.extend(metrics.validation_warnings.iter().cloned());

    Ok(Draft {
        content: rendition.content,
        metrics,
        warnings,
    })
}

// ─── 빌더 ──────────────────────────────────────────────────────────

/// 오케스트레이터 빌더
///
/// 레지스트리를 지정하지 않으면 설정의 `[platforms]`로 기본 레지스트리를 만듭니다.
pub struct OrchestratorBuilder {
    config: UdfBridgeConfig,
    registry: Option<TranslatorRegistry>,
    remote: Option<Arc<dyn RemoteValidator>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: UdfBridgeConfig::default(),
            registry: None,
            remote: None,
        }
    }

    /// 전체 설정을 지정합니다.
    pub fn config(mut self, config: UdfBridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// 번역기 레지스트리를 지정합니다.
    pub fn registry(mut self, registry: TranslatorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 원격 검증기를 설치합니다.
    pub fn remote_validator(mut self, validator: Arc<dyn RemoteValidator>) -> Self {
        self.remote = Some(validator);
        self
    }

    pub fn build(self) -> Result<TranslationOrchestrator, EngineError> {
        self.config.validate()?;
        let registry = match self.registry {
            Some(registry) => registry,
            None => TranslatorRegistry::from_config(&self.config)?,
        };

        let engine = &self.config.engine;
        info!(
            translators = registry.len(),
            cache_capacity = engine.cache_capacity,
            worker_pool_size = engine.worker_pool_size,
            accuracy_floor = engine.accuracy_floor,
            remote_validation = self.remote.is_some(),
            "translation orchestrator initialized"
        );

        let inner = Inner {
            cache: ResultCache::new(engine.cache_capacity),
            breakers: CircuitBreakers::new(engine.circuit_breaker.clone()),
            flights: SingleFlight::new(),
            stats: EngineStats::new(),
            registry,
            remote: self.remote,
            config: self.config,
        };
        Ok(TranslationOrchestrator {
            inner: Arc::new(inner),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
