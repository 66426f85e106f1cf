//! REST API tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use udfbridge_core::{PlatformConfig, UdfBridgeConfig};
use udfbridge_daemon::api::{self, AppState};
use udfbridge_engine::TranslationOrchestrator;

const SNORT_RULE: &str =
    r#"alert tcp any any -> any any (msg:"Test"; content:"malicious"; sid:1000001;)"#;

// ─── Helpers ────────────────────────────────────────────────────────

fn app_with(config: UdfBridgeConfig) -> Router {
    let orchestrator = TranslationOrchestrator::builder()
        .config(config)
        .build()
        .expect("engine should build");
    api::router(AppState::new(orchestrator))
}

fn app() -> Router {
    app_with(UdfBridgeConfig::default())
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Body>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.unwrap_or_else(Body::empty))
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, HeaderMap, Value) {
    let bytes = serde_json::to_vec(&body).expect("json should serialize");
    call(app, Method::POST, uri, Some(Body::from(bytes))).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, value) = call(app, Method::GET, uri, None).await;
    (status, value)
}

// ─── POST /v1/translate ─────────────────────────────────────────────

#[tokio::test]
async fn test_translate_siem_to_edr() {
    // Given: A signature rule submitted as SIEM content
    let app = app();

    // When: Translating to the EDR family
    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "detection_id": "det-1",
            "content": SNORT_RULE,
            "source_platform": "siem",
            "target_platform": "edr",
        }),
    )
    .await;

    // Then: 200 with a high-confidence translation
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["detection_id"], "det-1");
    assert_eq!(body["target_platform"], "edr");
    assert!(!body["translated_content"].as_str().unwrap_or("").is_empty());
    assert!(body["confidence_score"].as_f64().unwrap_or(0.0) >= 0.95);
    assert!(body["quality_metrics"]["false_positive_rate"].as_f64().unwrap_or(1.0) < 0.05);
    assert!(body["translated_at"].is_string());
}

#[tokio::test]
async fn test_translate_without_detection_id_omits_field() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": SNORT_RULE,
            "source_platform": "snort",
            "target_platform": "suricata",
            "options": { "optimization_level": 2, "timeout_ms": 5000 },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(body.get("detection_id").is_none());
}

#[tokio::test]
async fn test_translate_rejects_empty_content() {
    // Given: Whitespace-only content
    let app = app();

    // When: Translating
    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": "   ",
            "source_platform": "snort",
            "target_platform": "suricata",
        }),
    )
    .await;

    // Then: 400 input validation error
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_translate_rejects_unsupported_platform() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": SNORT_RULE,
            "source_platform": "snort",
            "target_platform": "arcsight",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unsupported_platform");
    assert!(body["message"].as_str().unwrap_or("").contains("arcsight"));
}

#[tokio::test]
async fn test_translate_parse_failure_is_unprocessable() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": "definitely not a rule",
            "source_platform": "snort",
            "target_platform": "suricata",
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "parse");
}

#[tokio::test]
async fn test_translate_below_floor_returns_partial_result() {
    // Given: An EDR validation rule the rendered content cannot satisfy
    let mut config = UdfBridgeConfig::default();
    config.platforms.insert(
        "edr".to_owned(),
        PlatformConfig {
            validation_rules: BTreeMap::from([(
                "host_scoped".to_owned(),
                "ComputerName".to_owned(),
            )]),
            ..PlatformConfig::default()
        },
    );
    let app = app_with(config);

    // When: Translating SIEM -> EDR
    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": SNORT_RULE,
            "source_platform": "siem",
            "target_platform": "edr",
        }),
    )
    .await;

    // Then: 422 with the computed result attached
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
    assert_eq!(body["code"], "accuracy_threshold");
    assert!(body["partial_result"]["content"].is_string());
    assert!(body["partial_result"]["confidence_score"].is_number());
}

#[tokio::test]
async fn test_translate_circuit_open_returns_retry_after() {
    // Given: Ten consecutive parse failures on one pair
    let app = app();
    for i in 0..10 {
        let (status, _, _) = post(
            &app,
            "/v1/translate",
            json!({
                "content": format!("garbage input {i}"),
                "source_platform": "snort",
                "target_platform": "suricata",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    // When: Sending a valid request on the same pair
    let (status, headers, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": SNORT_RULE,
            "source_platform": "snort",
            "target_platform": "suricata",
        }),
    )
    .await;

    // Then: 503 fail-fast with Retry-After equal to the cooldown
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "circuit_open");
    assert_eq!(body["retryable"], true);
    let retry_after: u64 = headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After should be set");
    assert!((1..=30).contains(&retry_after), "got {}", retry_after);

    // And: /healthz reports degraded but stays 200
    let (status, health) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert!(
        health["reason"]
            .as_str()
            .unwrap_or("")
            .contains("snort->suricata")
    );
}

#[tokio::test]
async fn test_translate_unknown_option_is_rejected() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/translate",
        json!({
            "content": SNORT_RULE,
            "source_platform": "snort",
            "target_platform": "suricata",
            "options": { "turbo": true },
        }),
    )
    .await;

    assert!(status.is_client_error(), "got {}", status);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();

    let (status, _, body) = call(
        &app,
        Method::POST,
        "/v1/translate",
        Some(Body::from("{not json")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    // Given: A 256-byte body limit
    let mut config = UdfBridgeConfig::default();
    config.server.max_body_bytes = 256;
    let app = app_with(config);

    // When: Posting a 1 KiB rule
    let (status, _, _) = post(
        &app,
        "/v1/translate",
        json!({
            "content": "x".repeat(1024),
            "source_platform": "snort",
            "target_platform": "suricata",
        }),
    )
    .await;

    // Then: 413 before reaching the engine
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ─── POST /v1/translate/batch ───────────────────────────────────────

#[tokio::test]
async fn test_batch_returns_partial_results() {
    // Given: Three valid requests and one with empty content
    let app = app();
    let requests: Vec<Value> = ["suricata", "zeek", "", "siem"]
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let (content, target) = if target.is_empty() {
                ("", "suricata")
            } else {
                (SNORT_RULE, *target)
            };
            json!({
                "request_id": format!("r{i}"),
                "content": content,
                "source_platform": "snort",
                "target_platform": target,
            })
        })
        .collect();

    // When: Submitting the batch
    let (status, _, body) =
        post(&app, "/v1/translate/batch", json!({ "requests": requests })).await;

    // Then: 200 with successes and failures split by request id
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["success_count"], 3);
    assert_eq!(body["failure_count"], 1);
    let responses = body["responses"].as_array().expect("responses array");
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["detection_id"], "r0");
    assert_eq!(responses[1]["target_platform"], "zeek");
    assert_eq!(responses[2]["detection_id"], "r3");
    let errors = body["errors"].as_array().expect("errors array");
    assert_eq!(errors[0]["request_id"], "r2");
    assert_eq!(errors[0]["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn test_batch_over_limit_is_rejected() {
    // Given: max_batch_size = 2
    let mut config = UdfBridgeConfig::default();
    config.server.max_batch_size = 2;
    let app = app_with(config);
    let request = json!({
        "content": SNORT_RULE,
        "source_platform": "snort",
        "target_platform": "suricata",
    });

    // When: Submitting three requests
    let (status, _, body) = post(
        &app,
        "/v1/translate/batch",
        json!({ "requests": [request.clone(), request.clone(), request] }),
    )
    .await;

    // Then: 400 without translating anything
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    let (_, stats) = get(&app, "/v1/stats").await;
    assert_eq!(stats["total_operations"], 0);
}

#[tokio::test]
async fn test_batch_assigns_missing_request_ids() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/translate/batch",
        json!({ "requests": [{
            "content": SNORT_RULE,
            "source_platform": "snort",
            "target_platform": "suricata",
        }]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = body["responses"][0]["detection_id"].as_str().unwrap_or("");
    assert!(id.starts_with("req-"), "got {}", id);
}

// ─── POST /v1/validate ──────────────────────────────────────────────

#[tokio::test]
async fn test_validate_success() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/validate",
        json!({ "content": SNORT_RULE, "target_platform": "snort" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["code"], "VALIDATION_SUCCESS");
    assert_eq!(body["level"], "info");
    assert!(
        body["message"]
            .as_str()
            .unwrap_or("")
            .starts_with("Validation passed with confidence score: ")
    );
    assert!(body["metrics"]["accuracy_score"].is_number());
}

#[tokio::test]
async fn test_validate_failure_is_reported_not_raised() {
    // Given: Content that is not a signature rule
    let app = app();

    // When: Validating against snort
    let (status, _, body) = post(
        &app,
        "/v1/validate",
        json!({ "content": "definitely not a rule", "target_platform": "snort" }),
    )
    .await;

    // Then: 200 with a Major failure summary and no metrics
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["level"], "major");
    assert!(body.get("metrics").is_none());
}

#[tokio::test]
async fn test_validate_does_not_touch_stats() {
    let app = app();

    let _ = post(
        &app,
        "/v1/validate",
        json!({ "content": SNORT_RULE, "target_platform": "snort" }),
    )
    .await;

    let (_, stats) = get(&app, "/v1/stats").await;
    assert_eq!(stats["total_operations"], 0);
    assert_eq!(stats["cached_results"], 0);
    assert_eq!(stats["cache_capacity"], 10_000);
}

#[tokio::test]
async fn test_validate_unknown_platform() {
    let app = app();

    let (status, _, body) = post(
        &app,
        "/v1/validate",
        json!({ "content": SNORT_RULE, "target_platform": "nope" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unsupported_platform");
}

// ─── GET endpoints ──────────────────────────────────────────────────

#[tokio::test]
async fn test_platforms_lists_registered_translators() {
    // Given: A configured deployed version for splunk
    let mut config = UdfBridgeConfig::default();
    config.platforms.insert(
        "splunk".to_owned(),
        PlatformConfig {
            version: "9.1.0".to_owned(),
            ..PlatformConfig::default()
        },
    );
    let app = app_with(config);

    // When: Listing platforms
    let (status, body) = get(&app, "/v1/platforms").await;

    // Then: Sorted ids with families and the configured version
    assert_eq!(status, StatusCode::OK);
    let platforms = body.as_array().expect("platform array");
    let ids: Vec<&str> = platforms.iter().filter_map(|p| p["id"].as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    for expected in ["snort", "suricata", "splunk", "siem", "edr"] {
        assert!(ids.contains(&expected), "missing {}", expected);
    }
    let splunk = platforms
        .iter()
        .find(|p| p["id"] == "splunk")
        .expect("splunk listed");
    assert_eq!(splunk["family"], "SIEM");
    assert_eq!(splunk["configured_version"], "9.1.0");
}

#[tokio::test]
async fn test_stats_after_translations() {
    // Given: The same translation twice (second is a cache hit)
    let app = app();
    let request = json!({
        "content": SNORT_RULE,
        "source_platform": "snort",
        "target_platform": "suricata",
    });
    let _ = post(&app, "/v1/translate", request.clone()).await;
    let _ = post(&app, "/v1/translate", request).await;

    // When: Reading stats
    let (status, stats) = get(&app, "/v1/stats").await;

    // Then: Counters reflect both calls
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_operations"], 2);
    assert_eq!(stats["success_count"], 2);
    assert_eq!(stats["cache_hits"], 1);
    assert_eq!(stats["cached_results"], 1);
    assert_eq!(stats["circuits"][0]["pair"], "snort->suricata");
    assert_eq!(stats["circuits"][0]["state"], "closed");
}

#[tokio::test]
async fn test_healthz_healthy() {
    let app = app();

    let (status, body) = get(&app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["translators"].as_u64().unwrap_or(0) > 0);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app();
    let (status, _) = get(&app, "/v2/translate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
