//! Interface source trait and address matching
//!
//! Defines how local interface addresses are enumerated and compared
//! against the target IP.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

/// How a rendered interface address is compared against the target IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The address text contains the target as a substring.
    /// Tolerates CIDR suffixes but `10.0.0.1` also matches `10.0.0.11/24`.
    #[default]
    Substring,
    /// The address part (before any `/`) parses to the same IP as the target
    Exact,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Substring => write!(f, "substring"),
            MatchMode::Exact => write!(f, "exact"),
        }
    }
}

impl MatchMode {
    /// Check whether a rendered address (`ip` or `ip/prefix`) matches the target
    pub fn matches(&self, address: &str, target: &str) -> bool {
        match self {
            MatchMode::Substring => address.contains(target),
            MatchMode::Exact => {
                let host = address.split('/').next().unwrap_or(address);
                match (host.parse::<IpAddr>(), target.parse::<IpAddr>()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
        }
    }
}

/// Errors that can occur while enumerating interfaces
#[derive(Debug, Error)]
pub enum PresenceError {
    /// Listing the interfaces themselves failed
    #[error("Failed to list network interfaces: {0}")]
    ListInterfaces(String),

    /// Listing the addresses of one interface failed
    #[error("Failed to list addresses for interface {name}: {reason}")]
    ListAddresses { name: String, reason: String },
}

/// One local interface and the result of listing its addresses
#[derive(Debug)]
pub struct InterfaceAddrs {
    pub name: String,
    /// Addresses in textual form, normally `ip/prefix`
    pub addresses: Result<Vec<String>, PresenceError>,
}

/// Source of local network interfaces and their addresses
pub trait InterfaceSource: Send + Sync {
    /// Take one snapshot of all local interfaces with their addresses.
    /// A failing interface carries its error in `addresses`.
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, PresenceError>;
}
