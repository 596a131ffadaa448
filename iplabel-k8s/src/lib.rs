//! iplabel Kubernetes Integration
//!
//! Provides the Kubernetes client, node label operations and workload
//! restart operations for iplabel.

pub mod client;
pub mod node_ops;
pub mod workload_ops;

pub use client::K8sClient;
pub use node_ops::NodeOperator;
pub use workload_ops::WorkloadOperator;
