//! 설정 관리 — udfbridge.toml 파싱 및 런타임 설정
//!
//! [`UdfBridgeConfig`]는 서비스 전체 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드되어 검증된 뒤 프로세스 수명 동안 읽기 전용으로 사용됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`UDFBRIDGE_SERVER_PORT=8080` 형식)
//! 3. 설정 파일 (`udfbridge.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), udfbridge_core::error::UdfBridgeError> {
//! use udfbridge_core::config::UdfBridgeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = UdfBridgeConfig::load("udfbridge.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = UdfBridgeConfig::parse("[engine]\naccuracy_floor = 0.95")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, UdfBridgeError};
use crate::udf::TranslationOptions;

/// udfbridge 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UdfBridgeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// API 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 번역 엔진 설정
    #[serde(default)]
    pub engine: TranslationEngineConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 플랫폼별 설정 (키: 플랫폼 식별자)
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformConfig>,
}

impl UdfBridgeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UdfBridgeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, UdfBridgeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UdfBridgeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                UdfBridgeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, UdfBridgeError> {
        toml::from_str(toml_str).map_err(|e| {
            UdfBridgeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `UDFBRIDGE_{SECTION}_{FIELD}`
    /// 예: `UDFBRIDGE_ENGINE_ACCURACY_FLOOR=0.95`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "UDFBRIDGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "UDFBRIDGE_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "UDFBRIDGE_GENERAL_PID_FILE");

        // Server (이전 배포의 변수명도 허용, 새 이름이 우선)
        override_u16(&mut self.server.port, "TRANSLATION_SERVICE_GRPC_PORT");
        override_usize(
            &mut self.server.max_batch_size,
            "TRANSLATION_SERVICE_MAX_BATCH_SIZE",
        );
        override_string(&mut self.server.listen_addr, "UDFBRIDGE_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "UDFBRIDGE_SERVER_PORT");
        override_usize(
            &mut self.server.max_batch_size,
            "UDFBRIDGE_SERVER_MAX_BATCH_SIZE",
        );
        override_usize(
            &mut self.server.max_body_bytes,
            "UDFBRIDGE_SERVER_MAX_BODY_BYTES",
        );

        // Engine
        override_u64(&mut self.engine.timeout_secs, "UDFBRIDGE_ENGINE_TIMEOUT_SECS");
        override_u8(
            &mut self.engine.optimization_level,
            "UDFBRIDGE_ENGINE_OPTIMIZATION_LEVEL",
        );
        override_bool(
            &mut self.engine.strict_validation,
            "UDFBRIDGE_ENGINE_STRICT_VALIDATION",
        );
        override_u32(
            &mut self.engine.retry_attempts,
            "UDFBRIDGE_ENGINE_RETRY_ATTEMPTS",
        );
        override_f64(
            &mut self.engine.accuracy_floor,
            "UDFBRIDGE_ENGINE_ACCURACY_FLOOR",
        );
        override_usize(
            &mut self.engine.worker_pool_size,
            "UDFBRIDGE_ENGINE_WORKER_POOL_SIZE",
        );
        override_usize(
            &mut self.engine.cache_capacity,
            "UDFBRIDGE_ENGINE_CACHE_CAPACITY",
        );
        override_u32(
            &mut self.engine.circuit_breaker.min_requests,
            "UDFBRIDGE_ENGINE_CIRCUIT_BREAKER_MIN_REQUESTS",
        );
        override_f64(
            &mut self.engine.circuit_breaker.failure_ratio,
            "UDFBRIDGE_ENGINE_CIRCUIT_BREAKER_FAILURE_RATIO",
        );
        override_u64(
            &mut self.engine.circuit_breaker.cooldown_secs,
            "UDFBRIDGE_ENGINE_CIRCUIT_BREAKER_COOLDOWN_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "UDFBRIDGE_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "UDFBRIDGE_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "UDFBRIDGE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), UdfBridgeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.server.port == 0 {
            return Err(invalid("server.port", "must be greater than 0"));
        }
        if self.server.max_batch_size == 0 {
            return Err(invalid("server.max_batch_size", "must be greater than 0"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes", "must be greater than 0"));
        }

        self.engine.validate()?;

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0"));
        }

        for (name, platform) in &self.platforms {
            platform.validate(name)?;
        }

        Ok(())
    }

    /// 플랫폼 설정 조회 (식별자 대소문자 무시)
    pub fn platform(&self, id: &str) -> Option<&PlatformConfig> {
        self.platforms
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(id))
            .map(|(_, config)| config)
    }

    /// 대상 플랫폼에 적용할 정확도 하한 (플랫폼 설정이 우선)
    pub fn accuracy_floor_for(&self, target: &str) -> f64 {
        self.platform(target)
            .and_then(|p| p.accuracy_floor)
            .unwrap_or(self.engine.accuracy_floor)
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> UdfBridgeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn check_ratio(field: &str, value: f64) -> Result<(), UdfBridgeError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be within (0, 1]"))
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 생성하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// API 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인드 주소
    pub listen_addr: String,
    /// 바인드 포트
    pub port: u16,
    /// 배치 요청 최대 항목 수
    pub max_batch_size: usize,
    /// 요청 본문 최대 크기 (바이트)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_owned(),
            port: 50053,
            max_batch_size: 100,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// 번역 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationEngineConfig {
    /// 기본 번역 제한 시간 (초)
    pub timeout_secs: u64,
    /// 기본 최적화 수준 (0–3)
    pub optimization_level: u8,
    /// 기본 엄격 검증 여부
    pub strict_validation: bool,
    /// 외부 의존 단계 기본 재시도 횟수
    pub retry_attempts: u32,
    /// 정확도 하한 (플랫폼 설정으로 재정의 가능)
    pub accuracy_floor: f64,
    /// 배치 작업자 수
    pub worker_pool_size: usize,
    /// 결과 캐시 최대 항목 수
    pub cache_capacity: usize,
    /// 회로 차단기 설정
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for TranslationEngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            optimization_level: 1,
            strict_validation: true,
            retry_attempts: 3,
            accuracy_floor: 0.99,
            worker_pool_size: 10,
            cache_capacity: 10_000,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl TranslationEngineConfig {
    fn validate(&self) -> Result<(), UdfBridgeError> {
        if self.timeout_secs == 0 {
            return Err(invalid("engine.timeout_secs", "must be greater than 0"));
        }
        if self.optimization_level > 3 {
            return Err(invalid("engine.optimization_level", "must be within 0..=3"));
        }
        check_ratio("engine.accuracy_floor", self.accuracy_floor)?;
        if self.worker_pool_size == 0 {
            return Err(invalid("engine.worker_pool_size", "must be greater than 0"));
        }
        if self.cache_capacity == 0 {
            return Err(invalid("engine.cache_capacity", "must be greater than 0"));
        }
        let cb = &self.circuit_breaker;
        if cb.min_requests == 0 {
            return Err(invalid(
                "engine.circuit_breaker.min_requests",
                "must be greater than 0",
            ));
        }
        check_ratio("engine.circuit_breaker.failure_ratio", cb.failure_ratio)?;
        if cb.window_secs == 0 {
            return Err(invalid(
                "engine.circuit_breaker.window_secs",
                "must be greater than 0",
            ));
        }
        if cb.half_open_max_requests == 0 {
            return Err(invalid(
                "engine.circuit_breaker.half_open_max_requests",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// 요청이 옵션을 생략했을 때 적용할 기본 번역 옵션
    pub fn default_options(&self) -> TranslationOptions {
        TranslationOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            optimization_level: self.optimization_level,
            strict_validation: self.strict_validation,
            retry_attempts: self.retry_attempts,
            ..TranslationOptions::default()
        }
    }
}

/// 회로 차단기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// 차단 판단에 필요한 최소 요청 수
    pub min_requests: u32,
    /// 차단 실패율 (이상이면 열림)
    pub failure_ratio: f64,
    /// 집계 윈도 길이 (초)
    pub window_secs: u64,
    /// 열림 상태 유지 시간 (초)
    pub cooldown_secs: u64,
    /// 반열림 상태 동시 탐침 요청 수
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: 10,
            failure_ratio: 0.6,
            window_secs: 10,
            cooldown_secs: 30,
            half_open_max_requests: 1,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스너 주소
    pub listen_addr: String,
    /// 리스너 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 플랫폼별 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// 대상 플랫폼 버전
    pub version: String,
    /// 원격 검증/배포 엔드포인트 (선택)
    pub api_endpoint: String,
    /// 콘텐츠 최대 크기 (바이트)
    pub max_content_size: usize,
    /// 규칙 이름 → 정규식 (콘텐츠가 반드시 만족해야 함)
    pub validation_rules: BTreeMap<String, String>,
    /// 정확도 하한 재정의
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_floor: Option<f64>,
    /// 원격 호출 재시도 정책
    pub retry_policy: RetryPolicyConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_owned(),
            api_endpoint: String::new(),
            max_content_size: 1024 * 1024,
            validation_rules: BTreeMap::new(),
            accuracy_floor: None,
            retry_policy: RetryPolicyConfig::default(),
        }
    }
}

impl PlatformConfig {
    fn validate(&self, name: &str) -> Result<(), UdfBridgeError> {
        if self.version.trim().is_empty() {
            return Err(invalid(
                &format!("platforms.{name}.version"),
                "must not be empty",
            ));
        }
        if self.max_content_size == 0 {
            return Err(invalid(
                &format!("platforms.{name}.max_content_size"),
                "must be greater than 0",
            ));
        }
        for (rule, pattern) in &self.validation_rules {
            if pattern.trim().is_empty() {
                return Err(invalid(
                    &format!("platforms.{name}.validation_rules.{rule}"),
                    "pattern must not be empty",
                ));
            }
        }
        if let Some(floor) = self.accuracy_floor {
            check_ratio(&format!("platforms.{name}.accuracy_floor"), floor)?;
        }
        self.retry_policy.validate(name)
    }
}

/// 재시도 정책 (지수 백오프)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    /// 최대 재시도 횟수
    pub max_retries: u32,
    /// 첫 재시도 대기 (밀리초)
    pub initial_interval_ms: u64,
    /// 최대 대기 (밀리초)
    pub max_interval_ms: u64,
    /// 백오프 배수
    pub multiplier: u32,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval_ms: 100,
            max_interval_ms: 2_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicyConfig {
    fn validate(&self, name: &str) -> Result<(), UdfBridgeError> {
        if self.initial_interval_ms > self.max_interval_ms {
            return Err(invalid(
                &format!("platforms.{name}.retry_policy.initial_interval_ms"),
                "must not exceed max_interval_ms",
            ));
        }
        if self.multiplier == 0 {
            return Err(invalid(
                &format!("platforms.{name}.retry_policy.multiplier"),
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u8(target: &mut u8, env_key: &str) {
    override_parsed(target, env_key, "u8");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_f64(target: &mut f64, env_key: &str) {
    override_parsed(target, env_key, "f64");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = UdfBridgeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 50053);
        assert_eq!(config.server.max_batch_size, 100);
        assert_eq!(config.engine.accuracy_floor, 0.99);
        assert_eq!(config.engine.worker_pool_size, 10);
        assert_eq!(config.engine.circuit_breaker.min_requests, 10);
        assert_eq!(config.engine.circuit_breaker.cooldown_secs, 30);
        assert!(!config.metrics.enabled);
        assert!(config.platforms.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        let config = UdfBridgeConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = UdfBridgeConfig::parse("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.engine.timeout_secs, 30);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let config = UdfBridgeConfig::parse(
            r#"
[engine]
accuracy_floor = 0.9

[engine.circuit_breaker]
cooldown_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.engine.accuracy_floor, 0.9);
        assert_eq!(config.engine.circuit_breaker.cooldown_secs, 5);
        assert_eq!(config.engine.circuit_breaker.min_requests, 10);
        assert_eq!(config.engine.worker_pool_size, 10);
    }

    #[test]
    fn from_str_platform_section() {
        let config = UdfBridgeConfig::parse(
            r#"
[platforms.splunk]
version = "9.1.0"
max_content_size = 4096
accuracy_floor = 0.8

[platforms.splunk.validation_rules]
has_search = "^search"

[platforms.splunk.retry_policy]
max_retries = 5
"#,
        )
        .unwrap();
        config.validate().unwrap();
        let splunk = config.platform("SPLUNK").unwrap();
        assert_eq!(splunk.version, "9.1.0");
        assert_eq!(splunk.max_content_size, 4096);
        assert_eq!(splunk.validation_rules["has_search"], "^search");
        assert_eq!(splunk.retry_policy.max_retries, 5);
        assert_eq!(splunk.retry_policy.initial_interval_ms, 100);
        assert_eq!(config.accuracy_floor_for("splunk"), 0.8);
        assert_eq!(config.accuracy_floor_for("qradar"), 0.99);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = UdfBridgeConfig::parse("[engine\naccuracy_floor = ").unwrap_err();
        assert!(matches!(
            err,
            UdfBridgeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = UdfBridgeConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general.log_level"));
    }

    #[test]
    fn validate_rejects_out_of_range_accuracy_floor() {
        let mut config = UdfBridgeConfig::default();
        config.engine.accuracy_floor = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("engine.accuracy_floor"));
    }

    #[test]
    fn validate_rejects_high_optimization_level() {
        let mut config = UdfBridgeConfig::default();
        config.engine.optimization_level = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = UdfBridgeConfig::default();
        config.server.max_batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.max_batch_size"));
    }

    #[test]
    fn validate_rejects_empty_platform_version() {
        let mut config = UdfBridgeConfig::default();
        config.platforms.insert(
            "zeek".to_owned(),
            PlatformConfig {
                version: " ".to_owned(),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("platforms.zeek.version"));
    }

    #[test]
    fn validate_rejects_inverted_retry_intervals() {
        let mut config = UdfBridgeConfig::default();
        let mut platform = PlatformConfig::default();
        platform.retry_policy.initial_interval_ms = 5_000;
        platform.retry_policy.max_interval_ms = 100;
        config.platforms.insert("snort".to_owned(), platform);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_validation_rule() {
        let mut config = UdfBridgeConfig::default();
        let mut platform = PlatformConfig::default();
        platform
            .validation_rules
            .insert("blank".to_owned(), String::new());
        config.platforms.insert("qradar".to_owned(), platform);
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_options_follow_engine_section() {
        let mut engine = TranslationEngineConfig::default();
        engine.timeout_secs = 5;
        engine.strict_validation = false;
        let opts = engine.default_options();
        assert_eq!(opts.timeout, Duration::from_secs(5));
        assert!(!opts.strict_validation);
        assert_eq!(opts.retry_attempts, 3);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_UDFBRIDGE_STR", "overridden") };
        override_string(&mut val, "TEST_UDFBRIDGE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_UDFBRIDGE_STR") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_f64_invalid_keeps_original() {
        let mut val = 0.99;
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("TEST_UDFBRIDGE_F64_BAD", "high") };
        override_f64(&mut val, "TEST_UDFBRIDGE_F64_BAD");
        assert_eq!(val, 0.99); // 원래 값 유지
        unsafe { std::env::remove_var("TEST_UDFBRIDGE_F64_BAD") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_new_name_wins_over_legacy() {
        let mut config = UdfBridgeConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe {
            std::env::set_var("TRANSLATION_SERVICE_MAX_BATCH_SIZE", "50");
            std::env::set_var("UDFBRIDGE_SERVER_MAX_BATCH_SIZE", "25");
        }
        config.apply_env_overrides();
        assert_eq!(config.server.max_batch_size, 25);
        unsafe {
            std::env::remove_var("TRANSLATION_SERVICE_MAX_BATCH_SIZE");
            std::env::remove_var("UDFBRIDGE_SERVER_MAX_BATCH_SIZE");
        }
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 7u32;
        override_u32(&mut val, "TEST_UDFBRIDGE_NONEXISTENT_12345");
        assert_eq!(val, 7);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = UdfBridgeConfig::default();
        config
            .platforms
            .insert("suricata".to_owned(), PlatformConfig::default());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = UdfBridgeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(config.engine.accuracy_floor, parsed.engine.accuracy_floor);
        assert!(parsed.platforms.contains_key("suricata"));
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = UdfBridgeConfig::from_file("/nonexistent/path/udfbridge.toml").await;
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            UdfBridgeError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
