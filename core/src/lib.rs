//! Core utilities and shared types for the netsweep engine.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

pub mod error;
pub mod probe;

pub use error::{Result, ScanError};
pub use probe::{HostProber, NeighborSource};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// A TCP port to probe together with its service label.
///
/// The number is kept as requested by the user; values outside the TCP range
/// are carried through the catalog and simply never report open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub number: u32,
    pub name: String,
}

impl PortEntry {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        PortEntry { number, name: name.into() }
    }
}

/// A catalog port number as a socket port, if it fits one.
pub fn tcp_port(number: u32) -> Option<u16> {
    u16::try_from(number).ok().filter(|p| *p != 0)
}

impl fmt::Display for PortEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.name)
    }
}

/// Outcome of the per-host pipeline for one responding address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub address: Ipv4Addr,
    pub reachable: bool,
    pub hostname: Option<String>,
    /// `None` when port probing was skipped for the run.
    pub open_ports: Option<Vec<PortEntry>>,
    #[serde(serialize_with = "serialize_latency_ms")]
    pub latency: Duration,
}

fn serialize_latency_ms<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Address to MAC mapping read from the OS neighbor table.
/// MACs are uppercase and colon separated.
pub type NeighborTable = HashMap<Ipv4Addr, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }

    #[test]
    fn tcp_port_rejects_out_of_range() {
        assert_eq!(tcp_port(22), Some(22));
        assert_eq!(tcp_port(65535), Some(65535));
        assert_eq!(tcp_port(65536), None);
        assert_eq!(tcp_port(0), None);
    }

    #[test]
    fn port_entry_display() {
        assert_eq!(PortEntry::new(443, "HTTPS").to_string(), "443/HTTPS");
    }
}
