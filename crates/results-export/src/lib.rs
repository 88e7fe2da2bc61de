//! Write result rows to disk. A `.csv` suffix (any case) selects
//! semicolon-delimited CSV; anything else gets ` | ` joined text lines.

use anyhow::Context;
use netsweep_core::ScanError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Text,
}

impl ExportFormat {
    pub fn for_path(path: &Path) -> Self {
        let is_csv = path
            .to_str()
            .map(|s| s.to_ascii_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        if is_csv { ExportFormat::Csv } else { ExportFormat::Text }
    }
}

/// Overwrite `path` with `rows`, one row per line.
pub fn export_rows<R, S>(path: &Path, rows: &[R]) -> Result<ExportFormat, ScanError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let format = ExportFormat::for_path(path);
    let written = match format {
        ExportFormat::Csv => write_csv(path, rows),
        ExportFormat::Text => write_text(path, rows),
    };
    written.map_err(|source| ScanError::Export { path: path.display().to_string(), source })?;
    debug!(path = %path.display(), rows = rows.len(), ?format, "results exported");
    Ok(format)
}

fn write_csv<R: AsRef<[S]>, S: AsRef<str>>(path: &Path, rows: &[R]) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.write_record(row.as_ref().iter().map(|f| f.as_ref()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_text<R: AsRef<[S]>, S: AsRef<str>>(path: &Path, rows: &[R]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for row in rows {
        let line = row.as_ref().iter().map(|f| f.as_ref()).collect::<Vec<_>>().join(" | ");
        writeln!(w, "{}", line)?;
    }
    w.flush()?;
    Ok(())
}
