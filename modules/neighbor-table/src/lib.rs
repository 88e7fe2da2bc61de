//! Read the OS neighbor (ARP) cache by shelling out to the platform tool and
//! scraping IPv4/MAC pairs from its text output.

use async_trait::async_trait;
use netsweep_core::{NeighborSource, NeighborTable, ScanError};
use regex::Regex;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, warn};

/// A dotted quad, then anything on the same line, then six hex octets
/// separated by `:` or `-`.
const NEIGHBOR_PATTERN: &str = r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}).*?([0-9A-Fa-f]{1,2}(?:[:-][0-9A-Fa-f]{1,2}){5})";

fn neighbor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NEIGHBOR_PATTERN).expect("neighbor pattern compiles"))
}

/// Uppercase, colon separated, two digits per octet.
pub fn normalize_mac(raw: &str) -> String {
    raw.split([':', '-'])
        .map(|octet| format!("{:0>2}", octet.to_ascii_uppercase()))
        .collect::<Vec<_>>()
        .join(":")
}

/// Extract address/MAC pairs from neighbor tool output. Lines without a MAC
/// (incomplete entries) are ignored; a repeated address keeps its last MAC.
pub fn parse_neighbor_output(text: &str) -> NeighborTable {
    let mut table = NeighborTable::new();
    for caps in neighbor_regex().captures_iter(text) {
        let Ok(ip) = caps[1].parse::<Ipv4Addr>() else { continue };
        table.insert(ip, normalize_mac(&caps[2]));
    }
    table
}

/// Program and arguments that list the neighbor table on `os`.
pub fn neighbor_command(os: &str) -> (&'static str, &'static [&'static str]) {
    match os {
        "windows" => (
            "powershell",
            &["-Command", "Get-NetNeighbor -AddressFamily IPv4 | Select-Object IPAddress, LinkLayerAddress"],
        ),
        "macos" => ("arp", &["-an"]),
        "linux" => ("arp", &["-n"]),
        _ => FALLBACK_COMMAND,
    }
}

/// Portable invocation used when the platform command cannot run.
pub const FALLBACK_COMMAND: (&str, &[&str]) = ("arp", &["-a"]);

async fn run_capture(program: &str, args: &[&str]) -> Result<String, ScanError> {
    let out = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ScanError::ExternalTool(format!("{}: {}", program, e)))?;
    if !out.status.success() {
        return Err(ScanError::ExternalTool(format!("{} exited with {}", program, out.status)));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Raw tool output: `primary`, then `fallback` once if the first cannot run
/// or exits non-zero.
pub async fn capture_with(primary: (&str, &[&str]), fallback: (&str, &[&str])) -> Result<String, ScanError> {
    match run_capture(primary.0, primary.1).await {
        Ok(text) => Ok(text),
        Err(e) => {
            debug!(error = %e, "platform neighbor command failed, trying fallback");
            run_capture(fallback.0, fallback.1).await
        }
    }
}

/// Parsed table from [`capture_with`]; empty when neither command works.
pub async fn fetch_with(primary: (&str, &[&str]), fallback: (&str, &[&str])) -> NeighborTable {
    match capture_with(primary, fallback).await {
        Ok(text) => {
            let table = parse_neighbor_output(&text);
            debug!(entries = table.len(), "neighbor table read");
            table
        }
        Err(e) => {
            warn!(error = %e, "neighbor table unavailable");
            NeighborTable::new()
        }
    }
}

/// Neighbor table from the system tools, chosen by the running platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNeighbors;

impl SystemNeighbors {
    pub async fn capture(&self) -> Result<String, ScanError> {
        capture_with(neighbor_command(std::env::consts::OS), FALLBACK_COMMAND).await
    }
}

#[async_trait]
impl NeighborSource for SystemNeighbors {
    async fn fetch_neighbor_table(&self) -> NeighborTable {
        fetch_with(neighbor_command(std::env::consts::OS), FALLBACK_COMMAND).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn colon_and_hyphen_forms_normalize_the_same() {
        let a = parse_neighbor_output("192.168.1.5 ... aa:bb:cc:dd:ee:ff");
        let b = parse_neighbor_output("192.168.1.5 ... aa-bb-cc-dd-ee-ff");
        assert_eq!(a.len(), 1);
        assert_eq!(a[&ip("192.168.1.5")], "AA:BB:CC:DD:EE:FF");
        assert_eq!(a, b);
    }

    #[test]
    fn linux_arp_n() {
        let out = "\
Address                  HWtype  HWaddress           Flags Mask            Iface
192.168.1.1              ether   a0:63:91:2b:4c:10   C                     wlan0
192.168.1.44                     (incomplete)                              wlan0
192.168.1.23             ether   3c:22:fb:0e:71:9a   C                     wlan0
";
        let t = parse_neighbor_output(out);
        assert_eq!(t.len(), 2);
        assert_eq!(t[&ip("192.168.1.1")], "A0:63:91:2B:4C:10");
        assert_eq!(t[&ip("192.168.1.23")], "3C:22:FB:0E:71:9A");
        assert!(!t.contains_key(&ip("192.168.1.44")));
    }

    #[test]
    fn macos_arp_an_pads_short_octets() {
        let out = "\
? (192.168.0.1) at 0:11:32:a:bc:d on en0 ifscope [ethernet]
? (192.168.0.17) at (incomplete) on en0 ifscope [ethernet]
? (192.168.0.255) at ff:ff:ff:ff:ff:ff on en0 ifscope [ethernet]
";
        let t = parse_neighbor_output(out);
        assert_eq!(t.len(), 2);
        assert_eq!(t[&ip("192.168.0.1")], "00:11:32:0A:BC:0D");
        assert_eq!(t[&ip("192.168.0.255")], "FF:FF:FF:FF:FF:FF");
    }

    #[test]
    fn windows_get_netneighbor() {
        let out = "\
IPAddress        LinkLayerAddress
---------        ----------------
224.0.0.22       01-00-5E-00-00-16
192.168.178.1    DC-39-6F-1A-22-B0
192.168.178.30   00-00-00-00-00-00
192.168.178.57
";
        let t = parse_neighbor_output(out);
        assert_eq!(t.len(), 3);
        assert_eq!(t[&ip("192.168.178.1")], "DC:39:6F:1A:22:B0");
        assert_eq!(t[&ip("224.0.0.22")], "01:00:5E:00:00:16");
    }

    #[test]
    fn bsd_style_arp_a() {
        let out = "gateway (10.0.0.1) at 52:54:00:12:35:02 on em0 expires in 1187 seconds [ethernet]\n";
        let t = parse_neighbor_output(out);
        assert_eq!(t[&ip("10.0.0.1")], "52:54:00:12:35:02");
    }

    #[test]
    fn mac_must_share_the_line() {
        let t = parse_neighbor_output("10.0.0.9 (incomplete)\nlink aa:bb:cc:dd:ee:ff\n");
        assert!(t.is_empty());
    }

    #[test]
    fn last_match_wins() {
        let out = "10.0.0.2 at 11:11:11:11:11:11\n10.0.0.2 at 22:22:22:22:22:22\n";
        let t = parse_neighbor_output(out);
        assert_eq!(t.len(), 1);
        assert_eq!(t[&ip("10.0.0.2")], "22:22:22:22:22:22");
    }

    #[test]
    fn empty_output_is_empty_table() {
        assert!(parse_neighbor_output("").is_empty());
        assert!(parse_neighbor_output("no entries\n").is_empty());
    }

    #[test]
    fn platform_commands() {
        assert_eq!(neighbor_command("linux"), ("arp", &["-n"][..]));
        assert_eq!(neighbor_command("macos"), ("arp", &["-an"][..]));
        assert_eq!(neighbor_command("windows").0, "powershell");
        assert_eq!(neighbor_command("openbsd"), FALLBACK_COMMAND);
    }

    const MISSING: (&str, &[&str]) = ("netsweep-no-such-tool", &[]);

    #[cfg(unix)]
    #[tokio::test]
    async fn fallback_used_when_platform_tool_missing() {
        let fallback = ("sh", &["-c", r#"printf "10.0.0.1 at aa-bb-cc-dd-ee-ff\n""#][..]);
        let t = fetch_with(MISSING, fallback).await;
        assert_eq!(t.len(), 1);
        assert_eq!(t[&ip("10.0.0.1")], "AA:BB:CC:DD:EE:FF");
    }

    #[tokio::test]
    async fn no_tools_gives_empty_table() {
        assert!(capture_with(MISSING, MISSING).await.is_err());
        assert!(fetch_with(MISSING, MISSING).await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_platform_tool_runs_fallback_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("runs");
        let script = format!("echo run >> '{}'; echo '10.0.0.7 at 52:54:00:12:35:02'", log.display());
        let failing = ("sh", &["-c", "echo '10.0.0.9 at 11:11:11:11:11:11'; exit 3"][..]);
        let t = fetch_with(failing, ("sh", &["-c", script.as_str()][..])).await;
        assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 1);
        assert_eq!(t.len(), 1);
        assert_eq!(t[&ip("10.0.0.7")], "52:54:00:12:35:02");
    }
}
