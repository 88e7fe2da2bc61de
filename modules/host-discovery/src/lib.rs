//! Host discovery over an IPv4 range: address enumeration, OS ping liveness,
//! reverse lookups and the worker-pool sweep that ties them together.

use ipnet::Ipv4Net;
use netsweep_core::{Result, ScanError};
use std::net::Ipv4Addr;

pub mod local;
pub mod ping;
pub mod resolve;
pub mod sweep;

pub use ping::SystemProber;
pub use sweep::{probe_host, start_sweep, Sweep, SweepOptions};

/// A parsed CIDR range. Host bits in the input are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    net: Ipv4Net,
}

impl AddressRange {
    pub fn parse(cidr: &str) -> Result<Self> {
        let net: Ipv4Net = cidr.trim().parse().map_err(|e| ScanError::invalid_range(cidr, e))?;
        Ok(AddressRange { net: net.trunc() })
    }

    pub fn network(&self) -> Ipv4Net {
        self.net
    }

    // First and last usable address. Ranges with more than two addresses
    // drop the network and broadcast addresses.
    fn bounds(&self) -> (u32, u32) {
        let first = u32::from(self.net.network());
        let last = u32::from(self.net.broadcast());
        if self.net.prefix_len() < 31 {
            (first + 1, last - 1)
        } else {
            (first, last)
        }
    }

    /// Number of addresses `hosts` yields.
    pub fn len(&self) -> u64 {
        let (first, last) = self.bounds();
        u64::from(last - first) + 1
    }

    /// A range always holds at least one address.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Usable addresses, ascending.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let (first, last) = self.bounds();
        (first..=last).map(Ipv4Addr::from)
    }
}

/// Count of candidate addresses in a CIDR string.
pub fn count_hosts(cidr: &str) -> Result<u64> {
    Ok(AddressRange::parse(cidr)?.len())
}

/// Expand a CIDR into its usable addresses.
pub fn expand_cidr(cidr: &str) -> Result<Vec<Ipv4Addr>> {
    Ok(AddressRange::parse(cidr)?.hosts().collect())
}
