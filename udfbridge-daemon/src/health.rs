//! Aggregated health reporting.
//!
//! Each component reports a [`HealthStatus`]; the translation engine's
//! status reflects every platform pair's circuit. The overall status is
//! the worst component status.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use std::time::Instant;

use serde::Serialize;

use udfbridge_core::HealthStatus;
use udfbridge_engine::{CircuitSnapshot, TranslationOrchestrator};

/// Health report served by `GET /healthz`.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Overall daemon health status (worst of all components).
    #[serde(flatten)]
    pub status: HealthStatus,
    /// Daemon uptime in seconds since start.
    pub uptime_secs: u64,
    pub version: &'static str,
    /// Number of registered translators.
    pub translators: usize,
    /// Per-component health reports.
    pub components: Vec<ComponentHealth>,
    /// Circuits that have seen traffic.
    pub circuits: Vec<CircuitSnapshot>,
}

/// Health status for a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
}

impl DaemonHealth {
    /// Collect a report from the engine.
    pub fn collect(orchestrator: &TranslationOrchestrator, started_at: Instant) -> Self {
        let components = vec![ComponentHealth {
            name: "translation-engine".to_owned(),
            status: orchestrator.health(),
        }];

        Self {
            status: aggregate_status(&components),
            uptime_secs: started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
            translators: orchestrator.registry().len(),
            components,
            circuits: orchestrator.circuits(),
        }
    }
}

/// Aggregate component statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let mut worst = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for component in components {
        match &component.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                if !worst.is_unhealthy() {
                    reasons.push(format!("{}: {}", component.name, reason));
                    worst = HealthStatus::Degraded(String::new());
                }
            }
            HealthStatus::Unhealthy(reason) => {
                if !worst.is_unhealthy() {
                    reasons.clear();
                }
                reasons.push(format!("{}: {}", component.name, reason));
                worst = HealthStatus::Unhealthy(String::new());
            }
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}
