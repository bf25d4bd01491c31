//! Data directory layout.

use std::path::{Path, PathBuf};

/// File name of the EPS table inside the data directory.
pub(crate) const EPS_TABLE_FILE: &str = "extracted_estimates.csv";

/// Get the default data directory path.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/epsilon/`
/// - macOS: `~/Library/Application Support/epsilon/`
/// - Windows: `%APPDATA%\epsilon\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("epsilon")
}

/// Paths derived from one data directory.
#[derive(Debug, Clone)]
pub(crate) struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Use `root`, or the default data directory when `None`.
    pub(crate) fn new(root: Option<PathBuf>) -> Self {
        Self {
            root: root.unwrap_or_else(default_data_dir),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// EPS table, unless overridden on the command line.
    pub(crate) fn eps_table(&self, overridden: Option<&Path>) -> PathBuf {
        overridden.map_or_else(|| self.root.join(EPS_TABLE_FILE), Path::to_path_buf)
    }

    /// Directory holding report PDFs.
    pub(crate) fn pdf_dir(&self) -> PathBuf {
        self.root.join("factset_pdfs")
    }

    /// Directory receiving extracted chart images.
    pub(crate) fn image_dir(&self) -> PathBuf {
        self.root.join("output").join("estimates")
    }

    /// Default location for a rendered chart.
    pub(crate) fn chart(&self, file_name: &str) -> PathBuf {
        self.root.join("output").join("charts").join(file_name)
    }
}
