use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG: &str = "netsweep.yaml";

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct SweepConfig {
    pub net: Option<String>,
    pub workers: Option<usize>,
    pub ports: Option<String>,
    pub timeout_ms: Option<u64>,
    pub ping_timeout_ms: Option<u64>,
    pub skip_hostname: Option<bool>,
    pub skip_ports: Option<bool>,
    pub skip_vendor: Option<bool>,
    pub vendor_db: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub sweep: Option<SweepConfig>,
}

/// Load `path`, or `./netsweep.yaml` when no path is given and the file exists.
/// An unreadable or malformed file is reported and ignored.
pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file unreadable, using defaults");
            return None;
        }
    };
    match serde_yaml::from_str(&s) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config file malformed, using defaults");
            None
        }
    }
}
