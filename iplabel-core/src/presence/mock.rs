//! Mock interface source for testing

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::RwLock;

use super::{InterfaceAddrs, InterfaceSource, PresenceError};

/// In-memory interface table with injectable failures
#[derive(Debug, Default)]
pub struct MockInterfaces {
    interfaces: RwLock<BTreeMap<String, Vec<String>>>,
    failing: RwLock<BTreeSet<String>>,
    /// Fail the whole interface listing
    pub fail_list: AtomicBool,
    /// Number of snapshots taken
    pub snapshots: AtomicU32,
}

impl MockInterfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with a single interface carrying the given addresses
    pub fn with_interface(name: &str, addresses: &[&str]) -> Self {
        let mock = Self::new();
        mock.set_interface(name, addresses);
        mock
    }

    /// Replace the addresses of an interface, creating it if needed
    pub fn set_interface(&self, name: &str, addresses: &[&str]) {
        if let Ok(mut table) = self.interfaces.write() {
            table.insert(
                name.to_string(),
                addresses.iter().map(|a| a.to_string()).collect(),
            );
        }
    }

    /// Remove an interface
    pub fn remove_interface(&self, name: &str) {
        if let Ok(mut table) = self.interfaces.write() {
            table.remove(name);
        }
    }

    /// Make address enumeration for one interface fail
    pub fn fail_addresses(&self, name: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(name.to_string());
        }
    }

    /// Set whether listing interfaces should fail
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

impl InterfaceSource for MockInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, PresenceError> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(PresenceError::ListInterfaces("mock failure".to_string()));
        }

        let table = self
            .interfaces
            .read()
            .map_err(|e| PresenceError::ListInterfaces(e.to_string()))?;
        let failing = self
            .failing
            .read()
            .map_err(|e| PresenceError::ListInterfaces(e.to_string()))?;

        Ok(table
            .iter()
            .map(|(name, addresses)| InterfaceAddrs {
                name: name.clone(),
                addresses: if failing.contains(name) {
                    Err(PresenceError::ListAddresses {
                        name: name.clone(),
                        reason: "mock failure".to_string(),
                    })
                } else {
                    Ok(addresses.clone())
                },
            })
            .collect())
    }
}
