//! Node Operations
//!
//! Reads and writes the presence label on the local node.

use anyhow::Result;
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use tracing::debug;

use super::client::K8sClient;
use iplabel_core::controller::NodeLabeler;

/// Current value of a label on a node
pub fn label_value<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.labels().get(key).map(String::as_str)
}

/// Set `key` to `value`, leaving other labels untouched.
/// Returns whether the node was modified.
pub fn apply_label(node: &mut Node, key: &str, value: &str) -> bool {
    if label_value(node, key) == Some(value) {
        return false;
    }
    node.labels_mut().insert(key.to_string(), value.to_string());
    true
}

/// Node operator for label reconciliation.
/// Wrap it in `DryRunLabeler` to simulate writes.
pub struct NodeOperator {
    client: K8sClient,
}

impl NodeOperator {
    /// Create a new node operator
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl NodeLabeler for NodeOperator {
    async fn current_label(&self, node: &str, key: &str) -> Result<Option<String>> {
        let node = self.client.get_node(node).await?;
        Ok(label_value(&node, key).map(str::to_string))
    }

    async fn set_label(&self, node_name: &str, key: &str, value: &str) -> Result<()> {
        let mut node = self.client.get_node(node_name).await?;

        if !apply_label(&mut node, key, value) {
            debug!(node = node_name, key = key, value = value, "Label already up to date");
            return Ok(());
        }

        self.client.replace_node(&node).await?;
        debug!(node = node_name, key = key, value = value, "Node object replaced");
        Ok(())
    }
}
