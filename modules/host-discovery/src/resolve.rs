//! Best-effort reverse DNS.

use dns_lookup::lookup_addr;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::time::timeout;
use tracing::trace;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Reverse lookup through the system resolver. Failures, timeouts and
/// numeric-only answers all yield `None`.
pub async fn reverse_lookup(addr: Ipv4Addr, wait: Duration) -> Option<String> {
    if wait.is_zero() {
        return None;
    }
    let ip = IpAddr::V4(addr);
    match timeout(wait, tokio::task::spawn_blocking(move || lookup_addr(&ip))).await {
        Ok(Ok(Ok(name))) => clean_hostname(&name, addr),
        Ok(Ok(Err(e))) => {
            trace!(%addr, error = %e, "reverse lookup failed");
            None
        }
        _ => None,
    }
}

/// Strip one trailing root label separator; drop empty names and names that
/// are just the address echoed back.
pub fn clean_hostname(name: &str, addr: Ipv4Addr) -> Option<String> {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name == addr.to_string() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

    #[test]
    fn trailing_dot_removed() {
        assert_eq!(clean_hostname("nas.lan.", ADDR).as_deref(), Some("nas.lan"));
        assert_eq!(clean_hostname("nas.lan", ADDR).as_deref(), Some("nas.lan"));
    }

    #[test]
    fn empty_and_numeric_answers_dropped() {
        assert_eq!(clean_hostname("", ADDR), None);
        assert_eq!(clean_hostname(".", ADDR), None);
        assert_eq!(clean_hostname("192.168.1.20", ADDR), None);
    }

    #[tokio::test]
    async fn zero_wait_gives_none() {
        assert_eq!(reverse_lookup(Ipv4Addr::LOCALHOST, Duration::ZERO).await, None);
    }

    #[tokio::test]
    async fn loopback_answer_is_cleaned() {
        if let Some(name) = reverse_lookup(Ipv4Addr::LOCALHOST, Duration::from_secs(3)).await {
            assert!(!name.is_empty());
            assert!(!name.ends_with('.'));
            assert_ne!(name, "127.0.0.1");
        }
    }
}
