//! Load, record and extraction steps shared by the commands.

use chrono::NaiveDate;
use epsilon::{MarketData, MarketError, PriceSourceConfig};
use epsilon_data::documents::{
    ChartLocator, ExtractionSummary, PopplerPageSource, ReportScanner, ScanPlan, extract_charts,
};
use epsilon_data::{DataError, EpsReport, EpsTable, EpsValue, QuarterLabel};
use epsilon_output::{ChartError, ExportError};
use epsilon_valuation::{EpsMode, ValuationError};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::paths::DataPaths;

/// Error type for command pipelines.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Reading or writing data failed.
    #[error(transparent)]
    Data(#[from] DataError),
    /// Loading market data failed.
    #[error(transparent)]
    Market(#[from] MarketError),
    /// Invalid valuation parameters.
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    /// Writing an export failed.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    /// Rendering or saving a chart failed.
    #[error("Chart failed: {0}")]
    Chart(#[from] ChartError),
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A `QUARTER=VALUE` entry could not be read.
    #[error("Invalid entry '{0}', expected QUARTER=VALUE such as Q1'24=55.1")]
    InvalidEntry(String),
    /// Nothing to record.
    #[error("No quarter values given for {0}")]
    EmptyReport(NaiveDate),
}

/// Load market data in `mode`.
pub(crate) async fn load_market(
    eps_path: &Path,
    config: &PriceSourceConfig,
    mode: EpsMode,
) -> Result<MarketData, PipelineError> {
    let market = MarketData::load(eps_path, config).await?;
    Ok(market.with_mode(mode))
}

/// Parse a `QUARTER=VALUE` entry such as `Q1'24=55.1` or `Q4'23=52.3*`.
///
/// An empty value or `-` records the quarter as unavailable.
pub(crate) fn parse_entry(entry: &str) -> Result<(QuarterLabel, EpsValue), PipelineError> {
    let (quarter, value) = entry
        .split_once('=')
        .ok_or_else(|| PipelineError::InvalidEntry(entry.to_string()))?;
    let quarter: QuarterLabel = quarter
        .trim()
        .parse()
        .map_err(|_| PipelineError::InvalidEntry(entry.to_string()))?;
    Ok((quarter, EpsValue::parse(value)))
}

/// Write one report row into the table at `table_path`.
///
/// Returns the recorded report and whether it replaced an existing row.
///
/// # Errors
///
/// Returns an error if an entry is malformed, no entry is given, or the table
/// cannot be read or saved.
pub(crate) fn record_report(
    table_path: &Path,
    date: NaiveDate,
    entries: &[String],
) -> Result<(EpsReport, bool), PipelineError> {
    if entries.is_empty() {
        return Err(PipelineError::EmptyReport(date));
    }

    let mut report = EpsReport::new(date);
    for entry in entries {
        let (quarter, value) = parse_entry(entry)?;
        report.insert(quarter, value);
    }

    let mut table = EpsTable::load_or_empty(table_path)?;
    let replaced = table.contains_date(date);
    table.upsert_report(report.clone());
    table.save(table_path)?;

    info!(
        %date,
        quarters = report.values.len(),
        replaced,
        table = %table_path.display(),
        "recorded EPS report"
    );
    Ok((report, replaced))
}

/// Plan extraction for documents newer than the table at `table_path`.
pub(crate) fn scan_pending(paths: &DataPaths, table_path: &Path) -> Result<ScanPlan, PipelineError> {
    let table = EpsTable::load_or_empty(table_path)?;
    let scanner = ReportScanner::new(paths.pdf_dir(), paths.image_dir());
    Ok(scanner.scan(table.last_report_date())?)
}

/// Render chart images for pending documents with the poppler tools.
pub(crate) fn run_extraction(
    paths: &DataPaths,
    table_path: &Path,
    limit: Option<usize>,
) -> Result<ExtractionSummary, PipelineError> {
    let plan = scan_pending(paths, table_path)?;
    std::fs::create_dir_all(paths.image_dir()).map_err(DataError::from)?;

    let total = limit.map_or(plan.pending.len(), |max| max.min(plan.pending.len()));
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Extracting EPS charts...");

    let summary = extract_charts(
        &plan,
        &PopplerPageSource::default(),
        &ChartLocator::default(),
        limit,
        Some(&pb),
    );
    pb.finish_with_message(format!("Extracted {} charts", summary.extracted));

    Ok(summary)
}
