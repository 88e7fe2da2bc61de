//! Port catalog resolution and TCP connect probing with a per-port timeout.

use netsweep_core::{tcp_port, PortEntry};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Timeout used for a single connect attempt when the caller does not pick one.
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(500);

/// Ports probed when the catalog spec is `default`.
pub const DEFAULT_PORTS: &[u32] = &[21, 22, 80, 443, 445, 3389];

/// Symbolic names accepted in a catalog spec.
const SERVICE_PORTS: &[(&str, u32)] = &[
    ("ftp", 21),
    ("ssh", 22),
    ("telnet", 23),
    ("smtp", 25),
    ("dns", 53),
    ("http", 80),
    ("https", 443),
    ("smb", 445),
    ("mysql", 3306),
    ("rdp", 3389),
    ("docker", 2375),
];

const PORT_LABELS: &[(u32, &str)] = &[
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (2375, "Docker"),
    (3306, "MySQL"),
    (3389, "RDP"),
];

/// Label for a port number, `Unknown` when it has none.
pub fn service_label(port: u32) -> &'static str {
    PORT_LABELS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

pub fn port_entry(port: u32) -> PortEntry {
    PortEntry::new(port, service_label(port))
}

/// The `default` catalog.
pub fn default_ports() -> Vec<PortEntry> {
    DEFAULT_PORTS.iter().map(|&p| port_entry(p)).collect()
}

/// Resolve a catalog spec: `default`, or a comma list of service names
/// (case-insensitive) and decimal port numbers.
///
/// Order and duplicates are preserved. Tokens that are neither a known name
/// nor a positive integer are skipped; the spec as a whole never fails.
pub fn parse_ports(spec: &str) -> Vec<PortEntry> {
    if spec.trim().eq_ignore_ascii_case("default") {
        return default_ports();
    }
    let mut ports = Vec::new();
    for token in spec.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        if let Some(&(_, port)) = SERVICE_PORTS.iter().find(|(name, _)| *name == token) {
            ports.push(port_entry(port));
            continue;
        }
        match token.parse::<u32>() {
            Ok(port) if port > 0 => ports.push(port_entry(port)),
            _ => {
                if !token.is_empty() {
                    trace!(token = %token, "skipping unrecognised port token");
                }
            }
        }
    }
    ports
}

/// Attempt one TCP connection. The stream is dropped as soon as it is
/// established; nothing is sent.
pub async fn check_port(addr: Ipv4Addr, port: u32, timeout_per_port: Duration) -> bool {
    let Some(port) = tcp_port(port) else {
        return false;
    };
    let sock = SocketAddr::from((addr, port));
    matches!(timeout(timeout_per_port, TcpStream::connect(sock)).await, Ok(Ok(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn numbers(v: &[PortEntry]) -> Vec<u32> {
        v.iter().map(|p| p.number).collect()
    }

    #[test]
    fn default_catalog() {
        let v = parse_ports("default");
        assert_eq!(numbers(&v), vec![21, 22, 80, 443, 445, 3389]);
        let labels: Vec<&str> = v.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(labels, vec!["FTP", "SSH", "HTTP", "HTTPS", "SMB", "RDP"]);
    }

    #[test]
    fn names_and_numbers_mixed() {
        let v = parse_ports("ssh,99999,http");
        assert_eq!(v, vec![PortEntry::new(22, "SSH"), PortEntry::new(99999, "Unknown"), PortEntry::new(80, "HTTP")]);
    }

    #[test]
    fn empty_spec_is_empty() {
        assert!(parse_ports("").is_empty());
    }

    #[test]
    fn names_are_case_insensitive_and_trimmed() {
        let v = parse_ports(" SSH , Https,MySQL ");
        assert_eq!(numbers(&v), vec![22, 443, 3306]);
        assert_eq!(v[2].name, "MySQL");
    }

    #[test]
    fn bad_tokens_skipped_duplicates_kept() {
        let v = parse_ports("22,abc,-5,0,,22,docker");
        assert_eq!(numbers(&v), vec![22, 22, 2375]);
        assert_eq!(v[2].name, "Docker");
    }

    #[test]
    fn known_number_gets_label() {
        assert_eq!(parse_ports("3389")[0].name, "RDP");
        assert_eq!(parse_ports("8080")[0].name, "Unknown");
    }

    #[tokio::test]
    async fn open_port_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_port(Ipv4Addr::LOCALHOST, port as u32, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn closed_port_and_out_of_range() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!check_port(Ipv4Addr::LOCALHOST, port as u32, Duration::from_millis(500)).await);
        assert!(!check_port(Ipv4Addr::LOCALHOST, 99999, Duration::from_millis(500)).await);
    }

    #[test]
    fn numbers_beyond_u32_skipped() {
        assert_eq!(numbers(&parse_ports("22,4294967296,80")), vec![22, 80]);
        assert_eq!(numbers(&parse_ports("4294967295")), vec![4294967295]);
    }
}
