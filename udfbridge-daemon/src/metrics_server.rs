//! Prometheus metrics HTTP endpoint.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! so the scrape endpoint stays separate from the translation API port.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use udfbridge_core::config::MetricsConfig;
use udfbridge_core::metrics as m;

/// Resolve the scrape listener address from configuration.
///
/// # Errors
///
/// - `endpoint` is anything other than `/metrics`
/// - `listen_addr:port` is not a valid socket address
pub fn listener_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }

    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// Call once per process. After this, every `metrics::counter!()`,
/// `metrics::gauge!()` and `metrics::histogram!()` in the engine is exported.
///
/// # Errors
///
/// - Invalid listener configuration (see [`listener_addr`])
/// - Socket binding fails
/// - Global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listener_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    tracing::info!(listen_addr = %addr, "installing Prometheus metrics recorder");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::TRANSLATION_DURATION_SECONDS.to_owned()),
            m::TRANSLATION_DURATION_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_addr_from_defaults() {
        // Given: Default metrics config
        let config = MetricsConfig::default();

        // When: Resolving the listener
        let addr = listener_addr(&config).expect("defaults should resolve");

        // Then: Loopback on the default port
        assert_eq!(addr.to_string(), "127.0.0.1:9100");
    }

    #[test]
    fn test_custom_endpoint_is_rejected() {
        // Given: A non-default scrape path
        let config = MetricsConfig {
            endpoint: "/prom".to_owned(),
            ..MetricsConfig::default()
        };

        // When / Then: Resolution fails and names the path
        let err = listener_addr(&config).expect_err("custom endpoint should fail");
        assert!(err.to_string().contains("/prom"));
    }

    #[test]
    fn test_invalid_listen_addr_is_rejected() {
        // Given: A host name instead of an IP
        let config = MetricsConfig {
            listen_addr: "not an address".to_owned(),
            ..MetricsConfig::default()
        };

        // When / Then
        let err = listener_addr(&config).expect_err("bad address should fail");
        assert!(err.to_string().contains("invalid metrics listen address"));
    }
}
