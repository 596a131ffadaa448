//! Presence detection
//!
//! Answers whether the target IP is currently bound to any local interface.

mod interface;
mod mock;
mod system;

pub use interface::*;
pub use mock::MockInterfaces;
pub use system::SystemInterfaces;

use std::sync::Arc;

use tracing::{debug, error, warn};

/// Detects whether a target IP is bound locally
pub struct PresenceDetector {
    source: Arc<dyn InterfaceSource>,
    target: String,
    mode: MatchMode,
}

impl PresenceDetector {
    /// Create a new presence detector
    pub fn new(source: Arc<dyn InterfaceSource>, target: String, mode: MatchMode) -> Self {
        Self {
            source,
            target,
            mode,
        }
    }

    /// The IP this detector is looking for
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Report whether any local interface address matches the target.
    ///
    /// Enumeration failures are logged and count as absence: a failing
    /// interface is skipped, a failed interface listing yields `false`.
    pub fn is_present(&self) -> bool {
        let interfaces = match self.source.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                error!(error = %e, "Failed to get network interfaces");
                return false;
            }
        };

        for iface in &interfaces {
            let addresses = match &iface.addresses {
                Ok(addresses) => addresses,
                Err(e) => {
                    warn!(interface = %iface.name, error = %e, "Failed to get interface addresses");
                    continue;
                }
            };

            if let Some(address) = addresses
                .iter()
                .find(|a| self.mode.matches(a, &self.target))
            {
                debug!(interface = %iface.name, address = %address, ip = %self.target, "Target IP found");
                return true;
            }
        }

        debug!(ip = %self.target, interfaces = interfaces.len(), "Target IP not bound");
        false
    }
}
