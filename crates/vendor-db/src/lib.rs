//! MAC prefix to vendor lookup backed by a Wireshark `manuf` file.
//!
//! The file is parsed at most once per `VendorDb`, on first use.

use netsweep_core::ScanError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

pub const DATABASE_URL: &str = "https://www.wireshark.org/download/automated/data/manuf";
pub const DEFAULT_PATH: &str = "manuf.txt";

/// Returned when the MAC has fewer than six hex digits.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";
/// Returned when the prefix is not in the database.
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

#[derive(Debug)]
pub struct VendorDb {
    path: PathBuf,
    map: OnceLock<HashMap<String, String>>,
}

impl VendorDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VendorDb { path: path.into(), map: OnceLock::new() }
    }

    /// A database already populated from `text`; never touches the disk.
    pub fn from_manuf(text: &str) -> Self {
        let db = VendorDb::new(PathBuf::new());
        let _ = db.map.set(parse_manuf(text));
        db
    }

    /// Load the file if that has not happened yet. Safe to call from many
    /// threads; only one read happens. A missing or unreadable file leaves an
    /// empty mapping and logs a warning.
    pub fn load(&self) -> usize {
        self.map
            .get_or_init(|| match std::fs::read_to_string(&self.path) {
                Ok(text) => {
                    let map = parse_manuf(&text);
                    debug!(path = %self.path.display(), prefixes = map.len(), "vendor database loaded");
                    map
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "vendor database not available, vendors will be unknown");
                    HashMap::new()
                }
            })
            .len()
    }

    pub fn is_loaded(&self) -> bool {
        self.map.get().is_some()
    }

    /// Vendor for a MAC in any common notation.
    pub fn lookup(&self, mac: &str) -> String {
        self.load();
        let clean: String = mac
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.') && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        if clean.len() < 6 || !clean.is_char_boundary(6) {
            return UNKNOWN_DEVICE.to_string();
        }
        self.map
            .get()
            .and_then(|m| m.get(&clean[..6]))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string())
    }
}

impl Default for VendorDb {
    fn default() -> Self {
        VendorDb::new(DEFAULT_PATH)
    }
}

/// Parse `manuf` text into prefix -> short vendor name.
///
/// Blank and `#` lines are skipped. Only 24-bit prefixes are kept; longer
/// masked assignments (`xx:xx:xx:x0:00:00/28`) are ignored.
pub fn parse_manuf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(prefix), Some(vendor)) = (fields.next(), fields.next()) else { continue };
        let prefix = prefix.replace(':', "");
        if prefix.len() == 6 {
            map.insert(prefix.to_ascii_uppercase(), vendor.to_string());
        }
    }
    map
}

/// Fetch the database from `url` and write it to `path`.
pub async fn download(url: &str, path: &Path) -> Result<u64, ScanError> {
    info!(%url, path = %path.display(), "downloading vendor database");
    let fail = |e: &dyn std::fmt::Display| ScanError::VendorDatabase(format!("{}: {}", url, e));
    let resp = reqwest::get(url).await.map_err(|e| fail(&e))?;
    let resp = resp.error_for_status().map_err(|e| fail(&e))?;
    let body = resp.bytes().await.map_err(|e| fail(&e))?;
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(&body).await?;
    file.flush().await?;
    Ok(body.len() as u64)
}
