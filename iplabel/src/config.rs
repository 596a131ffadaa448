//! Configuration module for iplabel
//!
//! Builds the immutable runtime configuration from parsed settings and
//! validates it before the loop starts.

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cli::{Cli, IpMatch, ResourceType};
use iplabel_core::controller::ControllerConfig;
use iplabel_core::presence::MatchMode;
use iplabel_core::state::{LabelValues, WorkloadKind, WorkloadRef};

static LABEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").unwrap());

static DNS_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Node whose label is reconciled
    pub node_name: String,

    /// Interval between presence checks
    pub check_interval: Duration,

    /// IP to look for
    pub ip_address: String,

    /// Address matching mode
    pub ip_match: MatchMode,

    /// Label key and values
    pub labels: LabelValues,

    /// Delay between activation and workload restart
    pub settle_delay: Duration,

    /// Workload restarted on activation
    pub workload: WorkloadRef,

    /// Dry run mode - log writes but don't execute
    pub dry_run: bool,
}

impl From<ResourceType> for WorkloadKind {
    fn from(kind: ResourceType) -> Self {
        match kind {
            ResourceType::Deployment => WorkloadKind::Deployment,
            ResourceType::StatefulSet => WorkloadKind::StatefulSet,
        }
    }
}

impl From<IpMatch> for MatchMode {
    fn from(mode: IpMatch) -> Self {
        match mode {
            IpMatch::Substring => MatchMode::Substring,
            IpMatch::Exact => MatchMode::Exact,
        }
    }
}

impl Config {
    /// Build configuration from parsed CLI/env settings
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            node_name: cli.hostname.clone(),
            check_interval: cli.check_interval,
            ip_address: cli.ip_address.clone(),
            ip_match: cli.ip_match.into(),
            labels: LabelValues::new(
                cli.node_label_key.clone(),
                cli.node_label_value_active.clone(),
                cli.node_label_value_inactive.clone(),
            ),
            settle_delay: cli.wait_time,
            workload: WorkloadRef {
                kind: cli.resource_type.into(),
                namespace: cli.resource_namespace.clone(),
                name: cli.resource_name.clone(),
            },
            dry_run: cli.dry_run,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.node_name.is_empty() {
            anyhow::bail!("HOSTNAME must not be empty");
        }
        if self.check_interval.is_zero() {
            anyhow::bail!("CHECK_INTERVAL must be > 0");
        }
        if self.ip_address.is_empty() {
            anyhow::bail!("IP_ADDRESS must not be empty");
        }
        if self.ip_match == MatchMode::Exact && self.ip_address.parse::<IpAddr>().is_err() {
            anyhow::bail!(
                "IP_ADDRESS must be a valid IP for exact matching: {}",
                self.ip_address
            );
        }
        validate_label_key(&self.labels.key)?;
        validate_label_value("NODE_LABEL_VALUE_ACTIVE", &self.labels.active)?;
        validate_label_value("NODE_LABEL_VALUE_INACTIVE", &self.labels.inactive)?;
        if self.labels.active == self.labels.inactive {
            anyhow::bail!("NODE_LABEL_VALUE_ACTIVE and NODE_LABEL_VALUE_INACTIVE must differ");
        }
        if self.workload.namespace.is_empty() {
            anyhow::bail!("RESOURCE_NAMESPACE must not be empty");
        }
        if self.workload.name.is_empty() {
            anyhow::bail!("RESOURCE_NAME must not be empty");
        }
        Ok(())
    }

    /// Settings for the controller loop
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            node_name: self.node_name.clone(),
            labels: self.labels.clone(),
            workload: self.workload.clone(),
            check_interval: self.check_interval,
            settle_delay: self.settle_delay,
        }
    }
}

fn validate_label_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.len() > 253 || !DNS_SUBDOMAIN.is_match(prefix) {
            anyhow::bail!("NODE_LABEL_KEY has an invalid prefix: {}", key);
        }
    }
    if name.is_empty() || name.len() > 63 || !LABEL_NAME.is_match(name) {
        anyhow::bail!("NODE_LABEL_KEY is not a valid label key: {}", key);
    }
    Ok(())
}

fn validate_label_value(setting: &str, value: &str) -> Result<()> {
    // Empty is a valid label value
    if value.is_empty() {
        return Ok(());
    }
    if value.len() > 63 || !LABEL_NAME.is_match(value) {
        anyhow::bail!("{} is not a valid label value: {}", setting, value);
    }
    Ok(())
}
