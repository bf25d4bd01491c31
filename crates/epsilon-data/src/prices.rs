//! Daily closing price series.

use crate::eps::parse_report_date;
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Days between 0001-01-01 and the Unix epoch, as counted by chrono.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Closing price on one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading day.
    pub date: NaiveDate,
    /// Closing price.
    pub price: f64,
}

impl PricePoint {
    /// Create a new price point.
    pub const fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Price")]
    price: Option<f64>,
}

/// Price history sorted ascending by date, one point per day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points in any order. Later duplicates of a date are dropped.
    ///
    /// Prices that are not finite and positive are dropped as missing.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        let received = points.len();
        points.retain(|p| p.price.is_finite() && p.price > 0.0);
        if points.len() != received {
            warn!(
                dropped = received - points.len(),
                "non-finite or non-positive prices dropped"
            );
        }

        points.sort_by_key(|p| p.date);
        let before = points.len();
        points.dedup_by_key(|p| p.date);
        if points.len() != before {
            warn!(
                dropped = before - points.len(),
                "duplicate price dates dropped"
            );
        }
        Self { points }
    }

    /// Read a `Date,Price` CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let series = Self::from_reader(File::open(path)?)?;
        info!(path = %path.display(), days = series.len(), "loaded price file");
        Ok(series)
    }

    /// Read `Date,Price` CSV data. Rows without a price are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut points = Vec::new();
        for row in rdr.deserialize() {
            let row: PriceRow = row?;
            if let Some(price) = row.price {
                points.push(PricePoint::new(parse_report_date(&row.date)?, price));
            }
        }
        Ok(Self::new(points))
    }

    /// Build a series from a frame with `date` (Date) and `close` columns.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let dates = df.column("date")?.cast(&DataType::Int32)?;
        let closes = df.column("close")?.cast(&DataType::Float64)?;

        let points = dates
            .as_materialized_series()
            .i32()?
            .into_iter()
            .zip(closes.as_materialized_series().f64()?)
            .filter_map(|(days, close)| {
                let date =
                    NaiveDate::from_num_days_from_ce_opt(days? + UNIX_EPOCH_DAYS_FROM_CE)?;
                Some(PricePoint::new(date, close?))
            })
            .collect();

        Ok(Self::new(points))
    }

    /// Convert to a frame with `date` (Date) and `close` columns.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self
            .points
            .iter()
            .map(|p| p.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();
        let closes: Vec<f64> = self.points.iter().map(|p| p.price).collect();

        let date_col = Series::new("date".into(), days).cast(&DataType::Date)?;
        let df = DataFrame::new(vec![
            date_col.into(),
            Series::new("close".into(), closes).into(),
        ])?;
        Ok(df)
    }

    /// All points, oldest first.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Trading days, oldest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// First trading day.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last trading day.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Number of trading days.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_sorts_and_dedups() {
        let series = PriceSeries::new(vec![
            PricePoint::new(date(2024, 1, 3), 4700.0),
            PricePoint::new(date(2024, 1, 2), 4690.0),
            PricePoint::new(date(2024, 1, 3), 9999.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some(date(2024, 1, 2)));
        assert_eq!(series.last_date(), Some(date(2024, 1, 3)));
    }

    #[test]
    fn test_from_reader() {
        let csv = "Date,Price\n2024-01-03,4704.81\n2024-01-02,4742.83\n2024-01-04,\n";
        let series = PriceSeries::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0], PricePoint::new(date(2024, 1, 2), 4742.83));
    }

    #[test]
    fn test_invalid_prices_are_missing() {
        let csv = "Date,Price\n2023-06-01,4120\n2023-06-02,NaN\n2023-06-05,inf\n2023-06-06,0\n2023-06-07,-1\n";
        let series = PriceSeries::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.last_date(), Some(date(2023, 6, 1)));

        let series = PriceSeries::new(vec![
            PricePoint::new(date(2024, 1, 2), f64::NAN),
            PricePoint::new(date(2024, 1, 3), f64::NEG_INFINITY),
            PricePoint::new(date(2024, 1, 4), 4700.0),
        ]);
        assert_eq!(series.dates(), vec![date(2024, 1, 4)]);
    }

    #[test]
    fn test_frame_conversion() {
        let series = PriceSeries::new(vec![
            PricePoint::new(date(1970, 1, 1), 92.06),
            PricePoint::new(date(2024, 2, 29), 5096.27),
        ]);

        let df = series.to_frame().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names(), vec!["date", "close"]);

        let back = PriceSeries::from_frame(&df).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_from_frame_requires_close() {
        let df = DataFrame::new(vec![Series::new("date".into(), vec![1_i32]).into()]).unwrap();
        assert!(PriceSeries::from_frame(&df).is_err());
    }
}
