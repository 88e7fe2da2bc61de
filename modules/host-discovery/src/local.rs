//! Default range detection from local interfaces.

use ipnet::Ipv4Net;
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};
use std::net::Ipv4Addr;
use tracing::debug;

/// Network of the first non-loopback IPv4 interface address.
pub fn local_subnet() -> Option<Ipv4Net> {
    let interfaces = match NetworkInterface::show() {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "listing interfaces failed");
            return None;
        }
    };
    interfaces
        .iter()
        .flat_map(|iface| iface.addr.iter())
        .find_map(|addr| match addr {
            Addr::V4(v4) if !v4.ip.is_loopback() && !v4.ip.is_unspecified() => subnet_of(v4.ip, v4.netmask),
            _ => None,
        })
}

/// Network containing `ip` under `netmask`. A missing mask is treated as /24.
pub fn subnet_of(ip: Ipv4Addr, netmask: Option<Ipv4Addr>) -> Option<Ipv4Net> {
    let prefix = netmask.map(|m| u32::from(m).count_ones() as u8).unwrap_or(24);
    Ipv4Net::new(ip, prefix).ok().map(|n| n.trunc())
}
