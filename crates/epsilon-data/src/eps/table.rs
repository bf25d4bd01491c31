//! CSV-backed table of EPS estimates, one row per report.

use super::value::EpsValue;
use crate::error::{DataError, Result};
use crate::quarter::QuarterLabel;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the date column in EPS tables.
pub const REPORT_DATE_COLUMN: &str = "Report_Date";

/// Parse a report date as written by the extraction tooling.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYYMMDD`.
pub fn parse_report_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .map_err(|_| DataError::InvalidDate(text.to_string()))
}

/// EPS estimates published in a single report.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsReport {
    /// Filing date of the report.
    pub report_date: NaiveDate,
    /// Available estimates keyed by quarter. Missing quarters are absent.
    pub values: BTreeMap<QuarterLabel, EpsValue>,
}

impl EpsReport {
    /// Create an empty report for `report_date`.
    pub const fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            values: BTreeMap::new(),
        }
    }

    /// Add an estimate, ignoring unavailable values.
    pub fn with_value(mut self, quarter: QuarterLabel, value: EpsValue) -> Self {
        self.insert(quarter, value);
        self
    }

    /// Insert an estimate. Unavailable values leave the quarter absent.
    pub fn insert(&mut self, quarter: QuarterLabel, value: EpsValue) {
        if value.is_available() {
            self.values.insert(quarter, value);
        } else {
            self.values.remove(&quarter);
        }
    }

    /// The estimate for `quarter`, `Unavailable` when the report does not carry it.
    pub fn value(&self, quarter: QuarterLabel) -> EpsValue {
        self.values.get(&quarter).copied().unwrap_or_default()
    }
}

/// All EPS reports, sorted by report date with unique dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpsTable {
    reports: Vec<EpsReport>,
    columns: BTreeSet<QuarterLabel>,
}

impl EpsTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from reports in any order.
    pub fn from_reports(reports: impl IntoIterator<Item = EpsReport>) -> Self {
        let mut table = Self::new();
        for report in reports {
            table.upsert_report(report);
        }
        table
    }

    /// Load a table from a CSV file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::read_csv(file, &path.display().to_string())?;
        info!(
            path = %path.display(),
            reports = table.len(),
            quarters = table.columns.len(),
            "loaded EPS table"
        );
        Ok(table)
    }

    /// Load a table, returning an empty one when the file does not exist yet.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_path(path)
        } else {
            debug!(path = %path.display(), "no EPS table yet, starting empty");
            Ok(Self::new())
        }
    }

    /// Read a table from any CSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::read_csv(reader, "EPS table")
    }

    fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let date_idx = headers
            .iter()
            .position(|h| h.trim() == REPORT_DATE_COLUMN)
            .ok_or_else(|| DataError::MissingColumn {
                column: REPORT_DATE_COLUMN.to_string(),
                source_name: source_name.to_string(),
            })?;

        let quarter_cols: Vec<(usize, QuarterLabel)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != date_idx)
            .filter_map(|(idx, header)| match header.parse::<QuarterLabel>() {
                Ok(label) => Some((idx, label)),
                Err(_) => {
                    debug!(column = header, "ignoring non-quarter column");
                    None
                }
            })
            .collect();

        let mut table = Self::new();
        table.columns.extend(quarter_cols.iter().map(|(_, q)| *q));

        for record in rdr.records() {
            let record = record?;
            let Some(date_text) = record.get(date_idx) else {
                continue;
            };
            if date_text.trim().is_empty() {
                continue;
            }
            let mut report = EpsReport::new(parse_report_date(date_text)?);
            for (idx, label) in &quarter_cols {
                if let Some(cell) = record.get(*idx) {
                    report.insert(*label, EpsValue::parse(cell));
                }
            }
            if table.contains_date(report.report_date) {
                warn!(date = %report.report_date, "duplicate report date, keeping the later row");
            }
            table.upsert_report(report);
        }

        Ok(table)
    }

    /// Write the table as CSV with quarter columns in chronological order.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec![REPORT_DATE_COLUMN.to_string()];
        header.extend(self.columns.iter().map(ToString::to_string));
        wtr.write_record(&header)?;

        for report in &self.reports {
            let mut row = vec![report.report_date.format("%Y-%m-%d").to_string()];
            row.extend(self.columns.iter().map(|q| report.value(*q).to_string()));
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Save the table to a CSV file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_writer(File::create(path)?)?;
        info!(path = %path.display(), reports = self.len(), "saved EPS table");
        Ok(())
    }

    /// Insert a report, replacing any existing report with the same date.
    pub fn upsert_report(&mut self, report: EpsReport) {
        self.columns.extend(report.values.keys().copied());
        match self
            .reports
            .binary_search_by_key(&report.report_date, |r| r.report_date)
        {
            Ok(idx) => self.reports[idx] = report,
            Err(idx) => self.reports.insert(idx, report),
        }
    }

    /// Whether a report exists for `date`.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.reports
            .binary_search_by_key(&date, |r| r.report_date)
            .is_ok()
    }

    /// All reports, oldest first.
    pub fn reports(&self) -> &[EpsReport] {
        &self.reports
    }

    /// Reports filed on or before `date`, oldest first.
    pub fn reports_on_or_before(&self, date: NaiveDate) -> &[EpsReport] {
        let end = self.reports.partition_point(|r| r.report_date <= date);
        &self.reports[..end]
    }

    /// Quarter columns known to the table, in chronological order.
    pub fn quarter_columns(&self) -> impl Iterator<Item = QuarterLabel> + '_ {
        self.columns.iter().copied()
    }

    /// Date of the oldest report.
    pub fn first_report_date(&self) -> Option<NaiveDate> {
        self.reports.first().map(|r| r.report_date)
    }

    /// Date of the newest report.
    pub fn last_report_date(&self) -> Option<NaiveDate> {
        self.reports.last().map(|r| r.report_date)
    }

    /// Number of reports.
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Whether the table has no reports.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Report_Date,Q1'23,Q2'23,Q3'23,Q4'23,Notes
2023-04-01,50.5,51,,53*,
2023-01-01,50,51,52,53,first
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn q(text: &str) -> QuarterLabel {
        text.parse().unwrap()
    }

    #[test]
    fn test_read_sorts_and_parses() {
        let table = EpsTable::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.first_report_date(), Some(date(2023, 1, 1)));
        assert_eq!(table.last_report_date(), Some(date(2023, 4, 1)));

        let latest = &table.reports()[1];
        assert_eq!(latest.value(q("Q1'23")), EpsValue::Value(50.5));
        assert_eq!(latest.value(q("Q3'23")), EpsValue::Unavailable);
        assert_eq!(latest.value(q("Q4'23")), EpsValue::Restated(53.0));

        let columns: Vec<String> = table.quarter_columns().map(|c| c.to_string()).collect();
        assert_eq!(columns, vec!["Q1'23", "Q2'23", "Q3'23", "Q4'23"]);
    }

    #[test]
    fn test_missing_report_date_column() {
        let result = EpsTable::from_reader("Date,Q1'23\n2023-01-01,1\n".as_bytes());
        assert!(matches!(result, Err(DataError::MissingColumn { .. })));
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let result = EpsTable::from_reader("Report_Date,Q1'23\nyesterday,1\n".as_bytes());
        assert!(matches!(result, Err(DataError::InvalidDate(_))));
    }

    #[test]
    fn test_duplicate_dates_keep_later_row() {
        let csv = "Report_Date,Q1'23\n2023-01-01,1\n2023-01-01,2\n";
        let table = EpsTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.reports()[0].value(q("Q1'23")), EpsValue::Value(2.0));
    }

    #[test]
    fn test_reports_on_or_before() {
        let table = EpsTable::from_reader(SAMPLE.as_bytes()).unwrap();

        assert!(table.reports_on_or_before(date(2022, 12, 31)).is_empty());
        assert_eq!(table.reports_on_or_before(date(2023, 1, 1)).len(), 1);
        assert_eq!(table.reports_on_or_before(date(2023, 3, 31)).len(), 1);
        assert_eq!(table.reports_on_or_before(date(2023, 4, 1)).len(), 2);
    }

    #[test]
    fn test_write_then_read_preserves_content() {
        let table = EpsTable::from_reader(SAMPLE.as_bytes()).unwrap();

        let mut buf = Vec::new();
        table.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("Report_Date,Q1'23,Q2'23,Q3'23,Q4'23\n"));
        assert!(text.contains("2023-04-01,50.5,51,,53*"));
        assert_eq!(EpsTable::from_reader(text.as_bytes()).unwrap(), table);
    }

    #[test]
    fn test_upsert_extends_columns() {
        let mut table = EpsTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let report = EpsReport::new(date(2023, 7, 1))
            .with_value(q("Q3'23"), EpsValue::Value(54.0))
            .with_value(q("Q1'24"), EpsValue::Value(55.0))
            .with_value(q("Q2'24"), EpsValue::Unavailable);
        table.upsert_report(report);

        assert_eq!(table.len(), 3);
        assert_eq!(table.last_report_date(), Some(date(2023, 7, 1)));
        assert!(table.quarter_columns().any(|c| c == q("Q1'24")));
        assert!(!table.quarter_columns().any(|c| c == q("Q2'24")));
    }

    #[test]
    fn test_parse_report_date_formats() {
        assert_eq!(parse_report_date("2024-03-08").unwrap(), date(2024, 3, 8));
        assert_eq!(
            parse_report_date("2024-03-08 00:00:00").unwrap(),
            date(2024, 3, 8)
        );
        assert_eq!(parse_report_date("20240308").unwrap(), date(2024, 3, 8));
        assert!(parse_report_date("08/03/2024").is_err());
    }

    #[test]
    fn test_save_and_load_or_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("extracted_estimates.csv");

        assert!(EpsTable::load_or_empty(&path).unwrap().is_empty());

        let table = EpsTable::from_reader(SAMPLE.as_bytes()).unwrap();
        table.save(&path).unwrap();
        assert_eq!(EpsTable::load_or_empty(&path).unwrap(), table);
    }
}
