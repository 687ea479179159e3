//! # Initialization
//!
//! Operator initialization: tracing, rustls setup, configuration, backup directory, metrics,
//! server startup and Kubernetes client setup. Every failure here is fatal.

use crate::config::{prepare_backup_dir, Cli, OperatorConfig, ServerConfig};
use crate::constants::IN_CLUSTER_ENV_VAR;
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the operator
pub struct InitializationResult {
    /// Resolved configuration
    pub config: OperatorConfig,
    /// Kubernetes client
    pub client: Client,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Cancelled when shutdown is requested
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("config", &self.config)
            .field("server_state", &self.server_state)
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
///
/// # Errors
///
/// Fails on invalid configuration, an unusable backup directory, a metrics server that does
/// not come up, or a Kubernetes client that cannot be built.
pub async fn initialize(cli: Cli) -> Result<InitializationResult> {
    if !observability::logging::init_tracing() {
        warn!("Tracing subscriber was already initialized");
    }

    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Cert Backup Operator v{}", env!("CARGO_PKG_VERSION"));

    let config = OperatorConfig::from_cli(cli).context("Invalid configuration")?;
    config.log_summary();

    prepare_backup_dir(&config.backup_dir)
        .await
        .context("Unable to use backup location")?;

    observability::metrics::register_metrics()?;

    let shutdown = CancellationToken::new();
    let server_state = Arc::new(ServerState::default());
    if config.server.is_enabled() {
        let server_state_clone = server_state.clone();
        let server_shutdown = shutdown.clone();
        let port = config.server.metrics_port;
        let server_handle = tokio::spawn(async move {
            if let Err(e) = start_server(port, server_state_clone, server_shutdown).await {
                error!("HTTP server error: {:#}", e);
            }
        });
        wait_for_server_ready(&config.server, &server_state, &server_handle).await?;
    } else {
        info!("Metrics server disabled (METRICS_PORT=0)");
    }

    let client = build_client(&config).await?;

    Ok(InitializationResult {
        config,
        client,
        server_state,
        shutdown,
    })
}

/// Build a client from in-cluster configuration when running in a pod, otherwise from the
/// kubeconfig file
///
/// # Errors
///
/// Fails when the selected configuration cannot be loaded or the client cannot be created.
pub async fn build_client(config: &OperatorConfig) -> Result<Client> {
    info!("trying in-cluster configuration...");
    let kube_config = if std::env::var_os(IN_CLUSTER_ENV_VAR).is_some() {
        Config::incluster().context("Unable to get in-cluster client config")?
    } else {
        info!("We are outside of k8s cluster, using kubeconfig...");
        let path = config
            .kubeconfig
            .as_deref()
            .context("No kubeconfig path available (pass --kubeconfig)")?;
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Unable to read kubeconfig {}", path.display()))?;
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("Unable to build client config")?
    };

    Client::try_from(kube_config).context("Unable to create Kubernetes client")
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_config: &ServerConfig,
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
