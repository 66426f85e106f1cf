//! udfbridge.toml 통합 설정 테스트
//!
//! - udfbridge.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 잘못된 형식 에러 테스트

use std::fs;

use tempfile::TempDir;
use udfbridge_core::config::UdfBridgeConfig;
use udfbridge_core::error::{ConfigError, UdfBridgeError};

// =============================================================================
// udfbridge.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../udfbridge.toml.example");
    let config = UdfBridgeConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.pid_file, "/var/run/udfbridge/udfbridged.pid");
    assert_eq!(config.server.port, 50053);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../udfbridge.toml.example");
    let config = UdfBridgeConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_platform_sections() {
    let content = include_str!("../../../udfbridge.toml.example");
    let config = UdfBridgeConfig::parse(content).expect("should parse");

    let names: Vec<&str> = config.platforms.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["crowdstrike", "qradar", "splunk", "suricata"]);

    let crowdstrike = config.platform("crowdstrike").expect("crowdstrike section");
    assert_eq!(crowdstrike.accuracy_floor, Some(0.95));
    assert_eq!(crowdstrike.retry_policy.initial_interval_ms, 200);
    assert_eq!(config.accuracy_floor_for("CrowdStrike"), 0.95);
    assert_eq!(config.accuracy_floor_for("splunk"), 0.99);
}

// =============================================================================
// 파일 로딩
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_applies_env_overrides_after_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("udfbridge.toml");
    fs::write(&path, "[server]\nport = 6000\n").expect("write config");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("UDFBRIDGE_SERVER_PORT", "7000") };
    let config = UdfBridgeConfig::load(&path).await;
    unsafe { std::env::remove_var("UDFBRIDGE_SERVER_PORT") };

    let config = config.expect("config should load");
    assert_eq!(config.server.port, 7000);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_env_override_result() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("udfbridge.toml");
    fs::write(&path, "").expect("write config");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("UDFBRIDGE_ENGINE_ACCURACY_FLOOR", "1.5") };
    let result = UdfBridgeConfig::load(&path).await;
    unsafe { std::env::remove_var("UDFBRIDGE_ENGINE_ACCURACY_FLOOR") };

    let err = result.expect_err("floor above 1 must be rejected");
    assert!(matches!(
        err,
        UdfBridgeError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn from_file_rejects_malformed_toml() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[engine\ntimeout_secs = 3").expect("write config");

    let err = UdfBridgeConfig::from_file(&path)
        .await
        .expect_err("malformed TOML should fail");
    assert!(matches!(
        err,
        UdfBridgeError::Config(ConfigError::ParseFailed { .. })
    ));
}
