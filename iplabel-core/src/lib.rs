//! iplabel Core Library
//!
//! Presence detection, label transitions and the reconcile loop.
//! Cluster access is abstracted behind the traits in [`controller`].

pub mod controller;
pub mod dry_run;
pub mod presence;
pub mod state;

// Re-export common types
pub use controller::{
    ControllerConfig, CycleOutcome, NodeLabeler, PresenceController, WorkloadRestarter,
};
pub use dry_run::DryRunLabeler;
pub use presence::{InterfaceAddrs, InterfaceSource, MatchMode, PresenceDetector, PresenceError};
pub use state::{LabelValues, PresenceState, Transition, WorkloadKind, WorkloadRef};
