//! CLI argument parsing for iplabel
//!
//! Every setting can come from its environment variable, which is how the
//! agent is normally configured inside a DaemonSet.

use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};

/// Kind of workload restarted on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceType {
    Deployment,
    #[value(name = "statefulset")]
    StatefulSet,
}

/// How interface addresses are compared with the target IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IpMatch {
    /// Address text contains the IP
    Substring,
    /// Address equals the IP
    Exact,
}

/// iplabel - label a node by IP presence and restart a workload on activation
#[derive(Debug, Parser)]
#[command(name = "iplabel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Name of the node to label
    #[arg(long, env = "HOSTNAME")]
    pub hostname: String,

    /// Interval between presence checks (e.g. 10s, 1m)
    #[arg(long, env = "CHECK_INTERVAL", value_parser = humantime::parse_duration)]
    pub check_interval: Duration,

    /// IP address to look for on local interfaces
    #[arg(long, env = "IP_ADDRESS")]
    pub ip_address: String,

    /// Node label key reflecting presence
    #[arg(long, env = "NODE_LABEL_KEY")]
    pub node_label_key: String,

    /// Label value written while the IP is present
    #[arg(long, env = "NODE_LABEL_VALUE_ACTIVE")]
    pub node_label_value_active: String,

    /// Label value written while the IP is absent
    #[arg(long, env = "NODE_LABEL_VALUE_INACTIVE")]
    pub node_label_value_inactive: String,

    /// Delay between activation and workload restart
    #[arg(long, env = "WAIT_TIME", value_parser = humantime::parse_duration)]
    pub wait_time: Duration,

    /// Namespace of the workload to restart
    #[arg(long, env = "RESOURCE_NAMESPACE")]
    pub resource_namespace: String,

    /// Name of the workload to restart
    #[arg(long, env = "RESOURCE_NAME")]
    pub resource_name: String,

    /// Kind of the workload to restart
    #[arg(long, env = "RESOURCE_TYPE", value_enum, ignore_case = true)]
    pub resource_type: ResourceType,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(
        long,
        default_value = "false",
        env = "LOG_JSON",
        value_parser = FalseyValueParser::new()
    )]
    pub log_json: bool,

    /// Address matching mode
    #[arg(long, env = "IP_MATCH", value_enum, ignore_case = true, default_value_t = IpMatch::Substring)]
    pub ip_match: IpMatch,

    /// Dry run mode - log writes but don't execute
    #[arg(
        long,
        default_value = "false",
        env = "DRY_RUN",
        value_parser = FalseyValueParser::new()
    )]
    pub dry_run: bool,

    /// Run a single reconcile cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Filter directive for the configured level. Unknown levels fall back to info.
    pub fn log_directive(&self) -> &'static str {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => "info",
        }
    }
}
