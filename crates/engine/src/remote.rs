//! 원격 검증 훅
//!
//! 플랫폼이 원격 검증 엔드포인트를 제공하는 경우, 로컬 검증 후에 호출됩니다.
//! 번역 로직과 달리 외부 의존이므로 `retry_attempts`만큼 지수 백오프로 재시도하며,
//! 재시도를 소진해도 번역을 실패시키지 않고 Minor 경고만 남깁니다.

use std::time::Duration;

use tracing::{debug, warn};

use udfbridge_core::config::RetryPolicyConfig;
use udfbridge_core::translator::BoxFuture;
use udfbridge_core::udf::Warning;

use crate::codes;

/// 원격 검증기
///
/// `Ok`는 원격 측이 보고한 경고 목록(없으면 통과)이고, `Err`는 호출 실패입니다.
pub trait RemoteValidator: Send + Sync {
    fn validate<'a>(
        &'a self,
        platform: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Warning>, String>>;
}

/// `retry` 번째 재시도 전 대기 시간 (0부터, `max_interval_ms`로 상한)
pub fn backoff_delay(policy: &RetryPolicyConfig, retry: u32) -> Duration {
    let factor = u64::from(policy.multiplier).saturating_pow(retry);
    let millis = policy
        .initial_interval_ms
        .saturating_mul(factor)
        .min(policy.max_interval_ms);
    Duration::from_millis(millis)
}

/// 재시도를 포함해 원격 검증을 수행하고, 결과 경고를 반환합니다.
pub(crate) async fn validate_with_retry(
    validator: &dyn RemoteValidator,
    platform: &str,
    content: &str,
    attempts: u32,
    policy: &RetryPolicyConfig,
) -> Vec<Warning> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(policy, attempt - 1)).await;
        }
        match validator.validate(platform, content).await {
            Ok(warnings) => {
                debug!(platform, attempt, warnings = warnings.len(), "remote validation done");
                return warnings;
            }
            Err(e) => {
                debug!(platform, attempt, error = %e, "remote validation attempt failed");
                last_error = e;
            }
        }
    }

    warn!(platform, attempts, error = %last_error, "remote validation unavailable");
    vec![Warning::minor(
        codes::REMOTE_VALIDATION_UNAVAILABLE,
        format!("remote validation for {platform} failed after {attempts} attempt(s): {last_error}"),
    )]
}
