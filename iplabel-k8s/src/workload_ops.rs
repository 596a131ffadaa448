//! Workload Operations
//!
//! Triggers a rolling restart of a Deployment or StatefulSet by stamping
//! the pod template, the same way `kubectl rollout restart` does.

use std::fmt::Debug;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::api::{Api, PostParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::client::K8sClient;
use iplabel_core::controller::WorkloadRestarter;
use iplabel_core::state::{WorkloadKind, WorkloadRef};

/// Pod template annotation whose change rolls all pods
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// A workload object that can be restarted through its pod template
pub trait RestartTarget {
    /// Replica count reported in status, 0 if unreported
    fn status_replicas(&self) -> i32;

    /// Mutable pod template, `None` if the object has no spec
    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec>;
}

impl RestartTarget for Deployment {
    fn status_replicas(&self) -> i32 {
        self.status.as_ref().and_then(|s| s.replicas).unwrap_or(0)
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|s| &mut s.template)
    }
}

impl RestartTarget for StatefulSet {
    fn status_replicas(&self) -> i32 {
        self.status.as_ref().map(|s| s.replicas).unwrap_or(0)
    }

    fn pod_template_mut(&mut self) -> Option<&mut PodTemplateSpec> {
        self.spec.as_mut().map(|s| &mut s.template)
    }
}

/// Set the restart annotation on a pod template, creating the annotation
/// map if needed. Returns the written timestamp.
pub fn stamp_restart(template: &mut PodTemplateSpec, at: DateTime<Utc>) -> String {
    let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(Default::default)
        .insert(RESTARTED_AT_ANNOTATION.to_string(), timestamp.clone());
    timestamp
}

/// Stamp a fetched workload for restart. Workloads reporting zero
/// replicas are rejected and left untouched.
pub fn prepare_restart<K: RestartTarget>(
    object: &mut K,
    workload: &WorkloadRef,
    at: DateTime<Utc>,
) -> Result<String> {
    if object.status_replicas() == 0 {
        anyhow::bail!("{} has no replicas", workload);
    }

    let template = object
        .pod_template_mut()
        .ok_or_else(|| anyhow!("{} has no spec", workload))?;

    Ok(stamp_restart(template, at))
}

/// Workload operator for rollout restarts
pub struct WorkloadOperator {
    client: K8sClient,
    dry_run: bool,
}

impl WorkloadOperator {
    /// Create a new workload operator
    pub fn new(client: K8sClient, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    async fn restart_object<K>(&self, api: Api<K>, workload: &WorkloadRef) -> Result<()>
    where
        K: Resource + RestartTarget + Clone + Debug + Serialize + DeserializeOwned,
    {
        let mut object = api
            .get_opt(&workload.name)
            .await
            .with_context(|| format!("Failed to get {}", workload))?
            .ok_or_else(|| anyhow!("{} not found", workload))?;

        let timestamp = prepare_restart(&mut object, workload, Utc::now())?;
        debug!(workload = %workload, restarted_at = %timestamp, "Stamped pod template");

        if self.dry_run {
            info!(
                workload = %workload,
                restarted_at = %timestamp,
                "[DRY-RUN] Would restart workload"
            );
            return Ok(());
        }

        api.replace(&workload.name, &PostParams::default(), &object)
            .await
            .with_context(|| format!("Failed to update {}", workload))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkloadRestarter for WorkloadOperator {
    async fn restart(&self, workload: &WorkloadRef) -> Result<()> {
        match workload.kind {
            WorkloadKind::Deployment => {
                let api = self.client.deployments(&workload.namespace);
                self.restart_object(api, workload).await
            }
            WorkloadKind::StatefulSet => {
                let api = self.client.statefulsets(&workload.namespace);
                self.restart_object(api, workload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kube::ResourceExt;
    use serde_json::json;

    fn workload(kind: WorkloadKind) -> WorkloadRef {
        WorkloadRef {
            kind,
            namespace: "edge".to_string(),
            name: "haproxy".to_string(),
        }
    }

    fn deployment(replicas: Option<i32>) -> Deployment {
        let mut value = json!({
            "metadata": { "name": "haproxy", "namespace": "edge" },
            "spec": {
                "selector": { "matchLabels": { "app": "haproxy" } },
                "template": {
                    "metadata": {
                        "labels": { "app": "haproxy" },
                        "annotations": { "prometheus.io/scrape": "true" }
                    }
                }
            }
        });
        if let Some(replicas) = replicas {
            value["status"] = json!({ "replicas": replicas });
        }
        serde_json::from_value(value).unwrap()
    }

    fn statefulset(replicas: i32) -> StatefulSet {
        serde_json::from_value(json!({
            "metadata": { "name": "haproxy", "namespace": "edge" },
            "spec": {
                "serviceName": "haproxy",
                "selector": { "matchLabels": { "app": "haproxy" } },
                "template": {}
            },
            "status": { "replicas": replicas }
        }))
        .unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    fn template_annotations(deployment: &Deployment) -> std::collections::BTreeMap<String, String> {
        deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.metadata.as_ref())
            .and_then(|m| m.annotations.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_stamp_restart_creates_annotations() {
        let mut template = PodTemplateSpec::default();
        let timestamp = stamp_restart(&mut template, fixed_time());

        assert_eq!(timestamp, "2024-03-09T14:05:00Z");
        let annotations = template.metadata.unwrap().annotations.unwrap();
        assert_eq!(annotations[RESTARTED_AT_ANNOTATION], "2024-03-09T14:05:00Z");
    }

    #[test]
    fn test_prepare_restart_keeps_other_annotations() {
        let mut object = deployment(Some(2));
        prepare_restart(&mut object, &workload(WorkloadKind::Deployment), fixed_time()).unwrap();

        let annotations = template_annotations(&object);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations["prometheus.io/scrape"], "true");
        assert_eq!(annotations[RESTARTED_AT_ANNOTATION], "2024-03-09T14:05:00Z");
    }

    #[test]
    fn test_prepare_restart_overwrites_previous_stamp() {
        let mut object = deployment(Some(1));
        let target = workload(WorkloadKind::Deployment);
        prepare_restart(&mut object, &target, fixed_time()).unwrap();

        let later = fixed_time() + chrono::Duration::minutes(10);
        prepare_restart(&mut object, &target, later).unwrap();

        assert_eq!(
            template_annotations(&object)[RESTARTED_AT_ANNOTATION],
            "2024-03-09T14:15:00Z"
        );
    }

    #[test]
    fn test_prepare_restart_rejects_zero_replicas() {
        let target = workload(WorkloadKind::Deployment);

        let mut scaled_down = deployment(Some(0));
        let before = scaled_down.clone();
        let err = prepare_restart(&mut scaled_down, &target, fixed_time()).unwrap_err();
        assert!(err.to_string().contains("has no replicas"));
        assert_eq!(scaled_down, before);

        // Missing status counts as zero replicas
        let mut no_status = deployment(None);
        assert!(prepare_restart(&mut no_status, &target, fixed_time()).is_err());
    }

    #[test]
    fn test_statefulset_restart_target() {
        let target = workload(WorkloadKind::StatefulSet);

        let mut empty = statefulset(0);
        assert!(prepare_restart(&mut empty, &target, fixed_time()).is_err());

        let mut running = statefulset(3);
        assert_eq!(running.status_replicas(), 3);
        prepare_restart(&mut running, &target, fixed_time()).unwrap();

        let template = &running.spec.as_ref().unwrap().template;
        let annotations = template.metadata.as_ref().unwrap().annotations.as_ref().unwrap();
        assert_eq!(annotations[RESTARTED_AT_ANNOTATION], "2024-03-09T14:05:00Z");
        assert_eq!(running.name_any(), "haproxy");
    }

    #[test]
    fn test_prepare_restart_without_spec() {
        let mut object: Deployment = serde_json::from_value(json!({
            "metadata": { "name": "haproxy" },
            "status": { "replicas": 1 }
        }))
        .unwrap();

        let err = prepare_restart(&mut object, &workload(WorkloadKind::Deployment), fixed_time())
            .unwrap_err();
        assert!(err.to_string().contains("has no spec"));
    }
}
