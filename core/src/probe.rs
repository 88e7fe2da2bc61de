//! Capability seams between the scan engine and the operating system.

use crate::NeighborTable;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Per-host probes used by the sweep pipeline.
///
/// Every method absorbs its own failures: unreachable, unresolvable and
/// closed are ordinary answers.
#[async_trait]
pub trait HostProber: Send + Sync + 'static {
    /// One liveness attempt, bounded in time, no retry.
    async fn is_reachable(&self, addr: Ipv4Addr) -> bool;

    /// Best-effort reverse lookup.
    async fn resolve_hostname(&self, addr: Ipv4Addr) -> Option<String>;

    /// One TCP connect attempt. Timeouts and refusals both read as closed.
    async fn is_port_open(&self, addr: Ipv4Addr, port: u32, timeout: Duration) -> bool;
}

/// Source of the OS neighbor (ARP) table.
#[async_trait]
pub trait NeighborSource: Send + Sync {
    async fn fetch_neighbor_table(&self) -> NeighborTable;
}
