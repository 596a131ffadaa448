//! Kubernetes Client wrapper
//!
//! Provides a simplified interface to the Kubernetes API.

use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, PostParams};
use kube::{Client, Config};
use tracing::info;

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a new K8s client from the pod's service account
    pub async fn in_cluster() -> Result<Self> {
        let config = Config::incluster().context("Failed to get in-cluster config")?;
        let client = Self::with_config(config)?;

        info!("Connected to Kubernetes API server");
        Ok(client)
    }

    /// Create a new K8s client with custom config
    pub fn with_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config)
            .context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    /// Get node API
    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    /// Get deployments API for a namespace
    pub fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Get statefulsets API for a namespace
    pub fn statefulsets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Get a node by name
    pub async fn get_node(&self, name: &str) -> Result<Node> {
        self.nodes()
            .get(name)
            .await
            .with_context(|| format!("Failed to get node: {}", name))
    }

    /// Write a node object back in full
    pub async fn replace_node(&self, node: &Node) -> Result<Node> {
        let name = node.metadata.name.as_deref().unwrap_or_default();
        self.nodes()
            .replace(name, &PostParams::default(), node)
            .await
            .with_context(|| format!("Failed to update node: {}", name))
    }
}
