//! Rendering chart pages for pending report documents.

use super::ScanPlan;
use super::locate::ChartLocator;
use super::poppler::PageSource;
use crate::error::Result;
use indicatif::ProgressBar;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

/// Outcome of an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    /// Images written.
    pub extracted: usize,
    /// Documents skipped by the scan.
    pub skipped: usize,
    /// Documents without a recognisable chart title.
    pub not_found: usize,
    /// Documents that failed to read or render.
    pub failed: usize,
}

/// Render the chart page of each pending document, newest first.
///
/// Stops after `limit` images when given. A failing document is logged and
/// counted, and the run moves on to the next one.
pub fn extract_charts<S: PageSource>(
    plan: &ScanPlan,
    source: &S,
    locator: &ChartLocator,
    limit: Option<usize>,
    progress: Option<&ProgressBar>,
) -> ExtractionSummary {
    let mut summary = ExtractionSummary {
        skipped: plan.skipped,
        ..Default::default()
    };

    for pending in &plan.pending {
        if limit.is_some_and(|max| summary.extracted >= max) {
            break;
        }
        if let Some(pb) = progress {
            pb.inc(1);
        }

        let date = pending.document.report_date;
        let pdf = pending.document.path.as_path();

        match extract_one(pdf, &pending.image_path, source, locator) {
            Ok(Some(page_index)) => {
                summary.extracted += 1;
                info!(
                    %date,
                    page = page_index + 1,
                    image = %pending.image_path.display(),
                    "extracted EPS chart"
                );
                if summary.extracted % 10 == 0 {
                    info!(extracted = summary.extracted, "extraction progress");
                }
            }
            Ok(None) => {
                summary.not_found += 1;
                warn!(%date, pdf = %pdf.display(), "no EPS chart title found");
            }
            Err(e) => {
                summary.failed += 1;
                error!(%date, pdf = %pdf.display(), error = %e, "extraction failed");
            }
        }
    }

    summary
}

fn extract_one<S: PageSource>(
    pdf: &Path,
    image_path: &Path,
    source: &S,
    locator: &ChartLocator,
) -> Result<Option<usize>> {
    let pages = source.page_texts(pdf)?;
    let Some(page_index) = locator.locate(&pages) else {
        return Ok(None);
    };

    if let Some(parent) = image_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    source.render_page(pdf, page_index, image_path)?;
    Ok(Some(page_index))
}
