//! Dry-run label simulation
//!
//! In dry-run mode nothing is written to the node, so the label read back
//! on the next cycle would still be the old one. [`DryRunLabeler`] remembers
//! the labels it would have written and serves them in place of the server
//! value, so transitions are observed once, as with real writes.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::controller::NodeLabeler;

/// Wraps a labeler, reading through it but recording writes in memory
pub struct DryRunLabeler<L: NodeLabeler> {
    inner: L,
    /// (node, key) -> value that would have been written
    simulated: Mutex<BTreeMap<(String, String), String>>,
}

impl<L: NodeLabeler> DryRunLabeler<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            simulated: Mutex::new(BTreeMap::new()),
        }
    }

    fn simulated(&self, node: &str, key: &str) -> Result<Option<String>> {
        let simulated = self
            .simulated
            .lock()
            .map_err(|e| anyhow!("dry-run label store poisoned: {}", e))?;
        Ok(simulated.get(&(node.to_string(), key.to_string())).cloned())
    }
}

#[async_trait::async_trait]
impl<L: NodeLabeler> NodeLabeler for DryRunLabeler<L> {
    async fn current_label(&self, node: &str, key: &str) -> Result<Option<String>> {
        // Always fetch so a missing node still surfaces as an error
        let server = self.inner.current_label(node, key).await?;
        Ok(self.simulated(node, key)?.or(server))
    }

    async fn set_label(&self, node: &str, key: &str, value: &str) -> Result<()> {
        info!(
            node = node,
            key = key,
            value = value,
            "[DRY-RUN] Would update node label"
        );

        let mut simulated = self
            .simulated
            .lock()
            .map_err(|e| anyhow!("dry-run label store poisoned: {}", e))?;
        simulated.insert((node.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerConfig, CycleOutcome, PresenceController, WorkloadRestarter};
    use crate::presence::{MatchMode, MockInterfaces, PresenceDetector};
    use crate::state::{LabelValues, PresenceState, WorkloadKind, WorkloadRef};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Node whose label stays fixed; writes are counted but never applied
    struct FixedNode {
        label: Option<String>,
        set_calls: AtomicU32,
        fail_get: AtomicBool,
    }

    impl FixedNode {
        fn new(label: Option<&str>) -> Self {
            Self {
                label: label.map(str::to_string),
                set_calls: AtomicU32::new(0),
                fail_get: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl NodeLabeler for FixedNode {
        async fn current_label(&self, _node: &str, _key: &str) -> Result<Option<String>> {
            if self.fail_get.load(Ordering::SeqCst) {
                anyhow::bail!("node not found");
            }
            Ok(self.label.clone())
        }

        async fn set_label(&self, _node: &str, _key: &str, _value: &str) -> Result<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingRestarter {
        call_count: AtomicU32,
    }

    #[async_trait::async_trait]
    impl WorkloadRestarter for CountingRestarter {
        async fn restart(&self, _workload: &WorkloadRef) -> Result<()> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_recorded_label_shadows_server() {
        let labeler = DryRunLabeler::new(FixedNode::new(Some("inactive")));
        assert_eq!(
            labeler.current_label("node-1", "vip").await.unwrap().as_deref(),
            Some("inactive")
        );

        labeler.set_label("node-1", "vip", "active").await.unwrap();
        assert_eq!(
            labeler.current_label("node-1", "vip").await.unwrap().as_deref(),
            Some("active")
        );
        assert_eq!(labeler.inner.set_calls.load(Ordering::SeqCst), 0);

        // Other keys still come from the server
        assert_eq!(
            labeler.current_label("node-1", "other").await.unwrap().as_deref(),
            Some("inactive")
        );
    }

    #[tokio::test]
    async fn test_node_fetch_failure_still_reported() {
        let labeler = DryRunLabeler::new(FixedNode::new(None));
        labeler.set_label("node-1", "vip", "active").await.unwrap();
        labeler.inner.fail_get.store(true, Ordering::SeqCst);

        assert!(labeler.current_label("node-1", "vip").await.is_err());
    }

    #[tokio::test]
    async fn test_single_restart_while_ip_stays_present() {
        let interfaces = Arc::new(MockInterfaces::with_interface("eth0", &["10.0.0.100/32"]));
        let labeler = Arc::new(DryRunLabeler::new(FixedNode::new(Some("inactive"))));
        let restarter = Arc::new(CountingRestarter {
            call_count: AtomicU32::new(0),
        });

        let controller = PresenceController::new(
            PresenceDetector::new(interfaces, "10.0.0.100".to_string(), MatchMode::Substring),
            labeler.clone(),
            restarter.clone(),
            ControllerConfig {
                node_name: "node-1".to_string(),
                labels: LabelValues::new("example.com/vip", "active", "inactive"),
                workload: WorkloadRef {
                    kind: WorkloadKind::Deployment,
                    namespace: "default".to_string(),
                    name: "haproxy".to_string(),
                },
                check_interval: Duration::from_millis(10),
                settle_delay: Duration::ZERO,
            },
        );

        assert_eq!(
            controller.run_once().await,
            CycleOutcome::Updated {
                state: PresenceState::Active,
                restarted: Some(true)
            }
        );
        for _ in 0..3 {
            assert_eq!(
                controller.run_once().await,
                CycleOutcome::Unchanged(PresenceState::Active)
            );
        }

        assert_eq!(restarter.call_count.load(Ordering::SeqCst), 1);
        assert_eq!(labeler.inner.set_calls.load(Ordering::SeqCst), 0);
    }
}
