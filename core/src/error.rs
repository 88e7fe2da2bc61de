use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Failures that can end a run or an auxiliary step.
///
/// Per-host and per-port probe failures are not represented here: they are
/// reported as negative results.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid address range {input:?}: {reason}")]
    InvalidRange { input: String, reason: String },

    #[error("neighbor table command failed: {0}")]
    ExternalTool(String),

    #[error("export to {path} failed: {source}")]
    Export {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("vendor database: {0}")]
    VendorDatabase(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn invalid_range(input: &str, reason: impl ToString) -> Self {
        ScanError::InvalidRange { input: input.to_string(), reason: reason.to_string() }
    }
}
