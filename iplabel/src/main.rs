//! iplabel
//!
//! Node-local agent that reflects whether a designated IP is bound on this
//! node into a node label, and restarts a dependent workload when the node
//! becomes active. Runs as a DaemonSet with host networking.

mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use iplabel_core::controller::{CycleOutcome, NodeLabeler, PresenceController};
use iplabel_core::dry_run::DryRunLabeler;
use iplabel_core::presence::{PresenceDetector, SystemInterfaces};
use iplabel_k8s::client::K8sClient;
use iplabel_k8s::node_ops::NodeOperator;
use iplabel_k8s::workload_ops::WorkloadOperator;

/// Initialize the tracing/logging subsystem
fn init_logging(log_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Resolve when Ctrl+C or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments and environment
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.log_directive(), cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "iplabel starting");

    let config = Config::from_cli(&cli);
    config.validate().context("Invalid configuration")?;

    info!(
        node = %config.node_name,
        ip = %config.ip_address,
        ip_match = %config.ip_match,
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    // Initialize K8s client and operators
    let k8s_client = K8sClient::in_cluster().await?;
    let node_operator = NodeOperator::new(k8s_client.clone());
    let labeler: Arc<dyn NodeLabeler> = if config.dry_run {
        Arc::new(DryRunLabeler::new(node_operator))
    } else {
        Arc::new(node_operator)
    };
    let restarter = Arc::new(WorkloadOperator::new(k8s_client, config.dry_run));

    let detector = PresenceDetector::new(
        Arc::new(SystemInterfaces::new()),
        config.ip_address.clone(),
        config.ip_match,
    );

    let controller =
        PresenceController::new(detector, labeler, restarter, config.controller_config());

    // Run single pass if --once flag is set
    if cli.once {
        info!("Running single reconcile cycle (--once mode)");
        let outcome = controller.run_once().await;
        info!(outcome = ?outcome, "Cycle complete");

        if outcome == CycleOutcome::NodeUnavailable {
            anyhow::bail!("Node {} could not be fetched", config.node_name);
        }
        return Ok(());
    }

    // Setup shutdown signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Run main loop
    controller.run(shutdown_rx).await?;

    info!("iplabel shutdown complete");
    Ok(())
}
