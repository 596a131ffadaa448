//! Presence state and label transitions
//!
//! The node label is the only persisted state. Each cycle derives the
//! desired state from presence and compares it with the label.

use std::fmt;

/// Presence state of the target IP on this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceState {
    /// The IP is bound locally
    Active,
    /// The IP is not bound locally
    Inactive,
}

impl PresenceState {
    pub fn from_presence(present: bool) -> Self {
        if present {
            PresenceState::Active
        } else {
            PresenceState::Inactive
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceState::Active => write!(f, "active"),
            PresenceState::Inactive => write!(f, "inactive"),
        }
    }
}

/// The node label key and the two values it may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelValues {
    pub key: String,
    pub active: String,
    pub inactive: String,
}

impl LabelValues {
    pub fn new(
        key: impl Into<String>,
        active: impl Into<String>,
        inactive: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            active: active.into(),
            inactive: inactive.into(),
        }
    }

    /// Label value to write for a state
    pub fn value_for(&self, state: PresenceState) -> &str {
        match state {
            PresenceState::Active => &self.active,
            PresenceState::Inactive => &self.inactive,
        }
    }
}

/// Result of comparing the current label against the desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Current label value, `None` if the key is missing
    pub from: Option<String>,
    /// Desired state
    pub to: PresenceState,
    /// Label value for `to`
    pub value: String,
    /// Whether the label must be written
    pub changed: bool,
}

impl Transition {
    /// Evaluate the transition for the current label and presence.
    /// A missing label always counts as a change.
    pub fn evaluate(current: Option<&str>, present: bool, labels: &LabelValues) -> Self {
        let to = PresenceState::from_presence(present);
        let value = labels.value_for(to).to_string();
        let changed = current != Some(value.as_str());

        Self {
            from: current.map(str::to_string),
            to,
            value,
            changed,
        }
    }

    /// A workload restart follows only a change into the active state
    pub fn requires_restart(&self) -> bool {
        self.changed && self.to == PresenceState::Active
    }
}

/// Kind of workload restarted on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadKind::Deployment => write!(f, "deployment"),
            WorkloadKind::StatefulSet => write!(f, "statefulset"),
        }
    }
}

/// Identifies the workload to restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
