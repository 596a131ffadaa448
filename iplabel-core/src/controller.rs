//! Presence Controller
//!
//! Polls IP presence, reconciles the node label and restarts the
//! configured workload when the node becomes active.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::presence::PresenceDetector;
use crate::state::{LabelValues, PresenceState, Transition, WorkloadRef};

/// Reads and writes the presence label on a node
#[async_trait::async_trait]
pub trait NodeLabeler: Send + Sync {
    /// Fetch the node and return the value of `key`, `None` if unset
    async fn current_label(&self, node: &str, key: &str) -> Result<Option<String>>;

    /// Fetch the node fresh, set `key` to `value` and write it back
    async fn set_label(&self, node: &str, key: &str, value: &str) -> Result<()>;
}

/// Triggers a rolling restart of a workload
#[async_trait::async_trait]
pub trait WorkloadRestarter: Send + Sync {
    async fn restart(&self, workload: &WorkloadRef) -> Result<()>;
}

/// Settings for the controller loop
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Node whose label is reconciled
    pub node_name: String,
    /// Label key and values
    pub labels: LabelValues,
    /// Workload restarted on activation
    pub workload: WorkloadRef,
    /// Pause between cycles
    pub check_interval: Duration,
    /// Pause between activation and restart
    pub settle_delay: Duration,
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The node could not be fetched
    NodeUnavailable,
    /// The label already matched
    Unchanged(PresenceState),
    /// The label write failed
    UpdateFailed(PresenceState),
    /// The label was written. `restarted` is `None` when no restart was
    /// attempted, otherwise whether the restart succeeded.
    Updated {
        state: PresenceState,
        restarted: Option<bool>,
    },
}

/// Single sequential reconcile loop
pub struct PresenceController<L: NodeLabeler + ?Sized, R: WorkloadRestarter + ?Sized> {
    detector: PresenceDetector,
    labeler: Arc<L>,
    restarter: Arc<R>,
    config: ControllerConfig,
}

impl<L: NodeLabeler + ?Sized, R: WorkloadRestarter + ?Sized> PresenceController<L, R> {
    /// Create a new presence controller
    pub fn new(
        detector: PresenceDetector,
        labeler: Arc<L>,
        restarter: Arc<R>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            detector,
            labeler,
            restarter,
            config,
        }
    }

    /// Run until shutdown is signalled
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            node = %self.config.node_name,
            ip = %self.detector.target(),
            label = %self.config.labels.key,
            workload = %self.config.workload,
            check_interval = ?self.config.check_interval,
            settle_delay = ?self.config.settle_delay,
            "Starting presence controller"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.cycle(&mut shutdown).await;
            debug!(outcome = ?outcome, "Cycle complete");

            if pause(self.config.check_interval, &mut shutdown).await {
                break;
            }
        }

        info!("Shutdown signal received, stopping controller");
        Ok(())
    }

    /// Run a single cycle (for --once mode)
    pub async fn run_once(&self) -> CycleOutcome {
        let (_tx, mut rx) = watch::channel(false);
        self.cycle(&mut rx).await
    }

    async fn cycle(&self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        let node = &self.config.node_name;
        let labels = &self.config.labels;

        let current = match self.labeler.current_label(node, &labels.key).await {
            Ok(current) => current,
            Err(e) => {
                error!(node = %node, error = %e, "Failed to get node information");
                return CycleOutcome::NodeUnavailable;
            }
        };

        let present = self.detector.is_present();
        let transition = Transition::evaluate(current.as_deref(), present, labels);

        if !transition.changed {
            debug!(
                key = %labels.key,
                value = %transition.value,
                "Label already set, no update needed"
            );
            return CycleOutcome::Unchanged(transition.to);
        }

        debug!(
            from = ?transition.from,
            to = %transition.value,
            "Updating node label"
        );

        if let Err(e) = self.labeler.set_label(node, &labels.key, &transition.value).await {
            error!(node = %node, error = %e, "Failed to update node label");
            return CycleOutcome::UpdateFailed(transition.to);
        }

        info!(
            node = %node,
            key = %labels.key,
            value = %transition.value,
            "Node label updated"
        );

        if !transition.requires_restart() {
            return CycleOutcome::Updated {
                state: transition.to,
                restarted: None,
            };
        }

        debug!(delay = ?self.config.settle_delay, "Waiting before workload restart");
        if pause(self.config.settle_delay, shutdown).await {
            info!(workload = %self.config.workload, "Shutdown during settle delay, restart skipped");
            return CycleOutcome::Updated {
                state: transition.to,
                restarted: None,
            };
        }

        let restarted = match self.restarter.restart(&self.config.workload).await {
            Ok(()) => {
                info!(workload = %self.config.workload, "Workload restarted");
                true
            }
            Err(e) => {
                error!(workload = %self.config.workload, error = %e, "Failed to restart workload");
                false
            }
        };

        CycleOutcome::Updated {
            state: transition.to,
            restarted: Some(restarted),
        }
    }
}

/// Sleep for `duration`. Returns true if shutdown was signalled first.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        if *shutdown.borrow() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone, nothing can signal shutdown anymore
                    tokio::time::sleep_until(deadline).await;
                    return false;
                }
            }
        }
    }
}
