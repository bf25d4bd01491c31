//! CSV and JSON export of valuation series.
//!
//! P/E series are written one row per trading day with the header
//! `Date,Price,EPS,PE_Ratio,Type`; unavailable EPS and ratios are empty cells.
//! Band analyses are written as a short comment block with the thresholds
//! followed by one row per region.

use epsilon_valuation::{BandAnalysis, PeRecord, PeSeries};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized output was not valid UTF-8.
    #[error("Invalid UTF-8 in output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Comma-separated values format.
    #[default]
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// Flattened P/E record for CSV export.
#[derive(Debug, Serialize)]
struct PeRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "EPS")]
    eps: Option<f64>,
    #[serde(rename = "PE_Ratio")]
    pe_ratio: Option<f64>,
    #[serde(rename = "Type")]
    mode: &'static str,
}

impl From<&PeRecord> for PeRow {
    fn from(record: &PeRecord) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d").to_string(),
            price: record.price,
            eps: record.eps,
            pe_ratio: record.pe_ratio,
            mode: record.mode.as_str(),
        }
    }
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn pe_rows_to_csv<'a>(records: impl Iterator<Item = &'a PeRecord>) -> Result<String, ExportError> {
    // header written explicitly so an empty series still has one
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(["Date", "Price", "EPS", "PE_Ratio", "Type"])?;
    for record in records {
        wtr.serialize(PeRow::from(record))?;
    }
    finish_csv(wtr)
}

impl Exporter for PeSeries {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => pe_rows_to_csv(self.records().iter()),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<PeSeries> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => pe_rows_to_csv(self.iter().flat_map(|s| s.records().iter())),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for BandAnalysis {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut output = String::new();

                output.push_str(&format!("# k: {}\n", self.k));
                output.push_str(&format!("# Mean: {:.4}\n", self.mean));
                output.push_str(&format!("# Std Dev: {:.4}\n", self.std_dev));
                output.push_str(&format!("# Upper: {:.4}\n", self.upper));
                output.push_str(&format!("# Lower: {:.4}\n", self.lower));

                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["kind", "start", "end"])?;
                for region in &self.regions {
                    wtr.write_record([
                        region.kind.to_string(),
                        region.start.format("%Y-%m-%d").to_string(),
                        region.end.format("%Y-%m-%d").to_string(),
                    ])?;
                }
                output.push_str(&finish_csv(wtr)?);
                Ok(output)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
