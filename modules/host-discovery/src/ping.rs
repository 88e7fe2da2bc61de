//! Liveness through the system `ping` utility, and the OS-backed prober.

use async_trait::async_trait;
use netsweep_core::HostProber;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(1000);

// Slack on top of the ping's own wait before the child is killed.
const PING_GRACE: Duration = Duration::from_millis(500);

/// Arguments for a single echo request on `os` (as in `std::env::consts::OS`).
/// `None` when the platform has no known invocation.
pub fn ping_args(os: &str, addr: Ipv4Addr, wait: Duration) -> Option<Vec<String>> {
    let secs = wait.as_millis().div_ceil(1000).max(1).to_string();
    let mut args: Vec<String> = match os {
        "windows" => vec!["-n".into(), "1".into(), "-w".into(), wait.as_millis().max(1).to_string()],
        "linux" | "android" => vec!["-c".into(), "1".into(), "-W".into(), secs],
        "macos" | "freebsd" => vec!["-c".into(), "1".into(), "-t".into(), secs],
        _ => return None,
    };
    args.push(addr.to_string());
    Some(args)
}

/// One ping, no retry. Any failure to run or to hear back is `false`.
pub async fn ping(addr: Ipv4Addr, wait: Duration) -> bool {
    let Some(args) = ping_args(std::env::consts::OS, addr, wait) else {
        return false;
    };
    ping_with("ping", &args, wait).await
}

/// Run `program` once; success is a zero exit within `wait` plus grace.
/// The child is killed when the deadline passes.
pub async fn ping_with(program: &str, args: &[String], wait: Duration) -> bool {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    match timeout(wait + PING_GRACE, cmd.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            debug!(program = %program, error = %e, "failed to run ping");
            false
        }
        Err(_) => false,
    }
}

/// Probes backed by the host OS: `ping`, the system resolver and TCP connect.
#[derive(Debug, Clone)]
pub struct SystemProber {
    pub ping_timeout: Duration,
    pub resolve_timeout: Duration,
}

impl Default for SystemProber {
    fn default() -> Self {
        SystemProber { ping_timeout: DEFAULT_PING_TIMEOUT, resolve_timeout: crate::resolve::DEFAULT_RESOLVE_TIMEOUT }
    }
}

#[async_trait]
impl HostProber for SystemProber {
    async fn is_reachable(&self, addr: Ipv4Addr) -> bool {
        ping(addr, self.ping_timeout).await
    }

    async fn resolve_hostname(&self, addr: Ipv4Addr) -> Option<String> {
        crate::resolve::reverse_lookup(addr, self.resolve_timeout).await
    }

    async fn is_port_open(&self, addr: Ipv4Addr, port: u32, timeout: Duration) -> bool {
        port_scan::check_port(addr, port, timeout).await
    }
}
