use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0:?} export is not available; it needs a document rendering service")]
    Unsupported(ReportFormat),
    #[error("there is no final output to export yet")]
    NothingToExport,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write the final output of a run to `dir/report_<timestamp>.<ext>`.
pub fn export_report(
    output: &str,
    dir: impl AsRef<Path>,
    format: ReportFormat,
    now: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    if format == ReportFormat::Pdf {
        return Err(ExportError::Unsupported(format));
    }
    if output.trim().is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "report_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ));
    fs::write(&path, output)?;
    info!(path = %path.display(), "report exported");
    Ok(path)
}
