//! Interface source backed by the operating system

use std::net::IpAddr;

use if_addrs::IfAddr;

use super::{InterfaceAddrs, InterfaceSource, PresenceError};

/// Reads interfaces from the host via `getifaddrs`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    pub fn new() -> Self {
        Self
    }
}

/// Render an interface address as `ip/prefix`
fn render_cidr(ip: IpAddr, prefix: u32) -> String {
    format!("{}/{}", ip, prefix)
}

fn prefix_len(addr: &IfAddr) -> u32 {
    match addr {
        IfAddr::V4(v4) => u32::from(v4.netmask).count_ones(),
        IfAddr::V6(v6) => u128::from(v6.netmask).count_ones(),
    }
}

impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceAddrs>, PresenceError> {
        let addrs = if_addrs::get_if_addrs()
            .map_err(|e| PresenceError::ListInterfaces(e.to_string()))?;

        // getifaddrs yields one entry per address; group them by interface
        let mut interfaces: Vec<(String, Vec<String>)> = Vec::new();
        for iface in addrs {
            let rendered = render_cidr(iface.ip(), prefix_len(&iface.addr));
            match interfaces.iter_mut().find(|(name, _)| *name == iface.name) {
                Some((_, list)) => list.push(rendered),
                None => interfaces.push((iface.name, vec![rendered])),
            }
        }

        Ok(interfaces
            .into_iter()
            .map(|(name, addresses)| InterfaceAddrs {
                name,
                addresses: Ok(addresses),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{MatchMode, PresenceDetector};
    use std::sync::Arc;

    #[test]
    fn test_render_cidr() {
        assert_eq!(
            render_cidr("10.1.2.3".parse().unwrap(), 24),
            "10.1.2.3/24"
        );
        assert_eq!(render_cidr("::1".parse().unwrap(), 128), "::1/128");
    }

    #[test]
    fn test_system_interfaces_are_listable() {
        let interfaces = SystemInterfaces::new().interfaces().unwrap();
        for iface in &interfaces {
            let addrs = iface.addresses.as_ref().unwrap();
            assert!(addrs.iter().all(|a| a.contains('/')));
        }
    }

    #[test]
    fn test_loopback_is_detected() {
        // Any host running the tests has an IPv4 loopback address
        let detector = PresenceDetector::new(
            Arc::new(SystemInterfaces::new()),
            "127.0.0.1".to_string(),
            MatchMode::Substring,
        );
        assert!(detector.is_present());
    }
}
