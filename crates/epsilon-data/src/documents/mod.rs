//! Earnings report documents and chart-page extraction.
//!
//! Report PDFs are named `<Prefix>_YYYYMMDD[_HHMMSS].pdf`. For each report not yet
//! reflected in the EPS table, the page carrying the bottom-up EPS chart is
//! located and rendered to `YYYYMMDD.png`; reading figures off that image happens
//! outside this crate.

pub mod extract;
pub mod locate;
pub mod poppler;

pub use extract::{ExtractionSummary, extract_charts};
pub use locate::{ChartLocator, DEFAULT_BOTTOM_THRESHOLD, DEFAULT_KEYWORDS, PageText, Word};
pub use poppler::{PageSource, PopplerPageSource};

use crate::error::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A report PDF whose file name carries its report date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Path to the PDF.
    pub path: PathBuf,
    /// Report date parsed from the file name.
    pub report_date: NaiveDate,
}

impl ReportDocument {
    /// Recognise a report document by its file name.
    ///
    /// Returns `None` for files that are not PDFs or whose second `_`-separated
    /// token is not a `YYYYMMDD` date.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return None;
        }

        let stem = path.file_stem()?.to_str()?;
        let token = stem.split('_').nth(1)?;
        let report_date = NaiveDate::parse_from_str(token, "%Y%m%d").ok()?;

        Some(Self {
            path: path.to_path_buf(),
            report_date,
        })
    }

    /// File name of the chart image for this report.
    pub fn image_file_name(&self) -> String {
        format!("{}.png", self.report_date.format("%Y%m%d"))
    }
}

/// A document awaiting extraction and where its image goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDocument {
    /// The report.
    pub document: ReportDocument,
    /// Target image path.
    pub image_path: PathBuf,
}

/// Documents to extract, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    /// Documents that still need an image.
    pub pending: Vec<PendingDocument>,
    /// Documents skipped because they are already reflected in the table or on disk.
    pub skipped: usize,
}

/// Finds report documents that still need extraction.
#[derive(Debug, Clone)]
pub struct ReportScanner {
    pdf_dir: PathBuf,
    image_dir: PathBuf,
}

impl ReportScanner {
    /// Create a scanner over `pdf_dir`, writing images into `image_dir`.
    pub fn new(pdf_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_dir: pdf_dir.into(),
            image_dir: image_dir.into(),
        }
    }

    /// Directory holding report PDFs.
    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    /// Directory receiving chart images.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// All recognised report documents, newest first.
    pub fn documents(&self) -> Result<Vec<ReportDocument>> {
        if !self.pdf_dir.is_dir() {
            warn!(dir = %self.pdf_dir.display(), "report directory does not exist");
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in std::fs::read_dir(&self.pdf_dir)? {
            let path = entry?.path();
            match ReportDocument::from_path(&path) {
                Some(doc) => documents.push(doc),
                None => debug!(path = %path.display(), "not a report document"),
            }
        }

        documents.sort_by(|a, b| {
            b.report_date
                .cmp(&a.report_date)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(documents)
    }

    /// Plan extraction of documents dated after `since` that have no image yet.
    ///
    /// `since` is normally the last report date already in the EPS table.
    pub fn scan(&self, since: Option<NaiveDate>) -> Result<ScanPlan> {
        let mut plan = ScanPlan::default();

        for document in self.documents()? {
            if since.is_some_and(|last| document.report_date <= last) {
                plan.skipped += 1;
                continue;
            }

            let image_path = self.image_dir.join(document.image_file_name());
            if image_path.exists() {
                plan.skipped += 1;
                continue;
            }

            plan.pending.push(PendingDocument {
                document,
                image_path,
            });
        }

        Ok(plan)
    }
}
