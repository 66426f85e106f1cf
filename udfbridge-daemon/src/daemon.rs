//! Daemon assembly and lifecycle management.
//!
//! The [`Daemon`] builds the translation engine from configuration,
//! serves the REST API, and handles the process lifecycle.
//!
//! # Lifecycle
//!
//! 1. Write PID file (if configured)
//! 2. Bind the API listener
//! 3. Spawn background tasks (uptime gauge)
//! 4. Serve until SIGTERM/SIGINT, draining in-flight requests
//! 5. Stop background tasks and remove the PID file

use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use udfbridge_core::UdfBridgeConfig;
use udfbridge_core::metrics as m;
use udfbridge_engine::TranslationOrchestrator;

use crate::api::{self, AppState};
use crate::metrics_server;

/// The translation daemon.
pub struct Daemon {
    /// Loaded and validated configuration.
    config: UdfBridgeConfig,
    orchestrator: TranslationOrchestrator,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Daemon {
    /// Load configuration from `config_path` and build the daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The engine cannot be assembled
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = UdfBridgeConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Installs the metrics recorder when `[metrics]` is enabled, so call
    /// at most once per process with metrics turned on.
    pub fn build_from_config(config: UdfBridgeConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before the engine registers its gauges
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let orchestrator = TranslationOrchestrator::builder()
            .config(config.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build translation engine: {}", e))?;

        let translators = orchestrator.registry().len();
        tracing::info!(translators, "daemon initialized");

        if config.metrics.enabled {
            record_daemon_metrics(translators);
        }

        let (shutdown_tx, _) = broadcast::channel(16);

        Ok(Self {
            config,
            orchestrator,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Serve the API until a shutdown signal is received.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    pub async fn run(&self) -> Result<()> {
        let pid_file = self.pid_file();
        if let Some(path) = pid_file {
            write_pid_file(path)?;
        }

        let addr = match api_addr(&self.config) {
            Ok(addr) => addr,
            Err(e) => {
                if let Some(path) = pid_file {
                    remove_pid_file(path);
                }
                return Err(e);
            }
        };
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(listen_addr = %addr, error = %e, "failed to bind API listener");
                if let Some(path) = pid_file {
                    remove_pid_file(path);
                }
                return Err(anyhow::anyhow!("failed to bind {}: {}", addr, e));
            }
        };

        let mut uptime_updater_task = if self.config.metrics.enabled {
            Some(spawn_uptime_updater(
                self.start_time,
                self.shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        let app = api::router(AppState::new(self.orchestrator.clone()));
        let shutdown_tx = self.shutdown_tx.clone();
        let mut signal_rx = self.shutdown_tx.subscribe();

        tracing::info!(listen_addr = %addr, "translation API listening");
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    signal = wait_for_shutdown_signal() => match signal {
                        Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
                        Err(e) => tracing::error!(error = %e, "signal handler failed, shutting down"),
                    },
                    _ = signal_rx.recv() => tracing::info!("shutdown requested"),
                }
                tracing::info!("broadcasting shutdown signal to all tasks");
                let _ = shutdown_tx.send(());
            })
            .await;

        // Stop background tasks even if serving failed
        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_updater_task.take() {
            let _ = task.await;
        }

        if let Some(path) = pid_file {
            remove_pid_file(path);
        }

        let stats = self.orchestrator.stats();
        tracing::info!(
            total_operations = stats.total_operations,
            success_rate = stats.success_rate,
            "daemon stopped"
        );

        served.map_err(|e| anyhow::anyhow!("API server failed: {}", e))
    }

    /// Request a graceful shutdown without an OS signal.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    pub fn orchestrator(&self) -> &TranslationOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &UdfBridgeConfig {
        &self.config
    }

    fn pid_file(&self) -> Option<&Path> {
        let pid_file = self.config.general.pid_file.as_str();
        (!pid_file.is_empty()).then(|| Path::new(pid_file))
    }
}

/// Resolve the API listener address from `[server]`.
pub fn api_addr(config: &UdfBridgeConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.server.listen_addr, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server listen address: {}", e))
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create the file
/// - Verifies the created file is a regular file
/// - Creates the parent directory with mode 0o700 and the file with 0o600
///
/// # Errors
///
/// Returns an error if the file already exists or cannot be written.
pub fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            fs::DirBuilder::new()
                .mode(0o700)
                .recursive(true)
                .create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !file.metadata()?.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
pub fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

fn record_daemon_metrics(translator_count: usize) {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_TRANSLATORS_REGISTERED).set(translator_count as f64);

    tracing::debug!(
        translator_count,
        version = env!("CARGO_PKG_VERSION"),
        "daemon metrics recorded"
    );
}

/// Spawn a background task that refreshes the uptime gauge every 10 seconds.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
