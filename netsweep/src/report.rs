//! Turning scan results into table rows, JSON records and terminal output.

use netsweep_core::{NeighborTable, PortEntry, ScanResult};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::net::Ipv4Addr;
use vendor_db::VendorDb;

pub const HEADER: [&str; 4] = ["IP Address", "Hostname", "Vendor", "Open Ports"];

/// Vendor column value when lookup is off or no MAC is known.
pub const NO_VENDOR: &str = "Unknown";

/// One responding host joined with its neighbor-table entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRow {
    pub address: Ipv4Addr,
    pub hostname: Option<String>,
    pub mac: Option<String>,
    pub vendor: String,
    pub open_ports: Option<Vec<PortEntry>>,
    pub latency_ms: u64,
}

impl HostRow {
    pub fn new(result: ScanResult, neighbors: &NeighborTable, vendors: Option<&VendorDb>) -> Self {
        let mac = neighbors.get(&result.address).cloned();
        let vendor = match (vendors, mac.as_deref()) {
            (Some(db), Some(mac)) => db.lookup(mac),
            _ => NO_VENDOR.to_string(),
        };
        HostRow {
            address: result.address,
            hostname: result.hostname,
            mac,
            vendor,
            open_ports: result.open_ports,
            latency_ms: result.latency.as_millis() as u64,
        }
    }

    pub fn cells(&self) -> [String; 4] {
        [
            self.address.to_string(),
            self.hostname.clone().unwrap_or_default(),
            self.vendor.clone(),
            format_ports(self.open_ports.as_deref()),
        ]
    }
}

/// `[22/SSH 80/HTTP]`, `[]` when nothing answered, `-` when ports were skipped.
pub fn format_ports(ports: Option<&[PortEntry]>) -> String {
    match ports {
        None => "-".to_string(),
        Some(ports) => format!("[{}]", ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" ")),
    }
}

/// Header plus rows, the shape handed to the exporter.
pub fn table_rows(rows: &[HostRow]) -> Vec<Vec<String>> {
    let mut out = vec![HEADER.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
    out.extend(rows.iter().map(|r| r.cells().to_vec()));
    out
}

/// Plain aligned table.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    let mut out = String::new();
    for (n, row) in rows.iter().enumerate() {
        let line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<w$}", cell, w = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(line.trim_end());
        out.push('\n');
        if n == 0 {
            let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");
            out.push_str(&rule);
            out.push('\n');
        }
    }
    out
}

const QUIPS: &[&str] = &[
    "Sweep complete. Every lit port has been counted.",
    "Network charted. Nobody was woken up.",
    "All quiet on the subnet, now on the record.",
    "Inventory complete. Even the silent ones were noted.",
    "Done. The ARP cache told us everything it knew.",
    "Target list finalized. Report is ready.",
    "Every address asked, every answer written down.",
];

pub fn completion_quip() -> &'static str {
    QUIPS.choose(&mut rand::thread_rng()).copied().unwrap_or("Sweep complete.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(last: u8, ports: Option<Vec<PortEntry>>) -> ScanResult {
        ScanResult {
            address: Ipv4Addr::new(192, 168, 1, last),
            reachable: true,
            hostname: Some("nas.lan".into()),
            open_ports: ports,
            latency: Duration::from_millis(3),
        }
    }

    #[test]
    fn vendor_joined_through_neighbor_table() {
        let db = VendorDb::from_manuf("B8:27:EB\tRaspberr\n");
        let mut neighbors = NeighborTable::new();
        neighbors.insert(Ipv4Addr::new(192, 168, 1, 5), "B8:27:EB:01:02:03".into());

        let row = HostRow::new(result(5, Some(vec![])), &neighbors, Some(&db));
        assert_eq!(row.vendor, "Raspberr");
        assert_eq!(row.mac.as_deref(), Some("B8:27:EB:01:02:03"));

        let row = HostRow::new(result(6, None), &neighbors, Some(&db));
        assert_eq!(row.vendor, NO_VENDOR);
        assert_eq!(row.mac, None);

        let row = HostRow::new(result(5, None), &neighbors, None);
        assert_eq!(row.vendor, NO_VENDOR);
    }

    #[test]
    fn port_column() {
        let ports = vec![PortEntry::new(22, "SSH"), PortEntry::new(80, "HTTP")];
        assert_eq!(format_ports(Some(&ports)), "[22/SSH 80/HTTP]");
        assert_eq!(format_ports(Some(&[])), "[]");
        assert_eq!(format_ports(None), "-");
    }

    #[test]
    fn rows_start_with_header() {
        let row = HostRow::new(result(7, Some(vec![PortEntry::new(443, "HTTPS")])), &NeighborTable::new(), None);
        let rows = table_rows(&[row]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], HEADER.to_vec());
        assert_eq!(rows[1], vec!["192.168.1.7", "nas.lan", "Unknown", "[443/HTTPS]"]);
    }

    #[test]
    fn table_columns_align() {
        let rows = vec![
            vec!["a".to_string(), "bb".to_string()],
            vec!["ccc".to_string(), "d".to_string()],
        ];
        assert_eq!(render_table(&rows), "a   | bb\n----+---\nccc | d\n");
    }

    #[test]
    fn quip_is_from_the_list() {
        assert!(QUIPS.contains(&completion_quip()));
    }
}
