//! Daily price-to-earnings series.

use crate::aggregate::{EpsAggregator, EpsMode};
use chrono::NaiveDate;
use epsilon_data::{EpsTable, PriceSeries};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price, EPS and P/E on one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeRecord {
    /// Trading day.
    pub date: NaiveDate,
    /// Closing price.
    pub price: f64,
    /// Four-quarter EPS, `None` when unavailable.
    pub eps: Option<f64>,
    /// `price / eps`, present exactly when `eps` is.
    pub pe_ratio: Option<f64>,
    /// EPS mode used.
    pub mode: EpsMode,
}

/// One [`PeRecord`] per price date, ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeSeries {
    mode: EpsMode,
    records: Vec<PeRecord>,
}

impl PeSeries {
    /// Join `prices` with the EPS sums from `table`.
    ///
    /// Every price date yields a record. Dates before the first report, or
    /// whose four quarters are incomplete, keep their price but carry no EPS
    /// and no ratio.
    pub fn compute(table: &EpsTable, prices: &PriceSeries, mode: EpsMode) -> Self {
        let aggregator = EpsAggregator::new(table);
        let records: Vec<PeRecord> = prices
            .points()
            .iter()
            .map(|point| {
                let eps = aggregator.eps_at(point.date, mode);
                PeRecord {
                    date: point.date,
                    price: point.price,
                    eps,
                    pe_ratio: eps.map(|e| point.price / e),
                    mode,
                }
            })
            .collect();

        debug!(
            %mode,
            records = records.len(),
            available = records.iter().filter(|r| r.pe_ratio.is_some()).count(),
            "computed P/E series"
        );

        Self { mode, records }
    }

    /// EPS mode of the series.
    pub const fn mode(&self) -> EpsMode {
        self.mode
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[PeRecord] {
        &self.records
    }

    /// The latest record with an available ratio.
    pub fn current(&self) -> Option<&PeRecord> {
        self.records.iter().rev().find(|r| r.pe_ratio.is_some())
    }

    /// Dates paired with their P/E, for banding and plotting.
    pub fn ratio_points(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.records.iter().map(|r| (r.date, r.pe_ratio)).collect()
    }

    /// Available P/E values in date order.
    pub fn available_ratios(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.pe_ratio).collect()
    }

    /// Dates of all records.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the series has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use epsilon_data::{EpsReport, EpsValue, PricePoint};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> EpsTable {
        let report = ["Q1'23", "Q2'23", "Q3'23", "Q4'23"]
            .iter()
            .zip([50.0, 51.0, 52.0, 53.0])
            .fold(EpsReport::new(date(2023, 1, 1)), |r, (label, v)| {
                r.with_value(label.parse().unwrap(), EpsValue::Value(v))
            });
        EpsTable::from_reports([report])
    }

    #[test]
    fn test_pe_is_price_over_eps() {
        let prices = PriceSeries::new(vec![PricePoint::new(date(2023, 6, 1), 4120.0)]);
        let series = PeSeries::compute(&table(), &prices, EpsMode::Forward);
        let record = series.records()[0];
        assert_relative_eq!(record.eps.unwrap(), 206.0);
        assert_relative_eq!(record.pe_ratio.unwrap(), 20.0);
        assert_eq!(record.mode, EpsMode::Forward);
    }

    #[test]
    fn test_dates_before_first_report_keep_price() {
        let prices = PriceSeries::new(vec![
            PricePoint::new(date(2022, 12, 30), 3839.5),
            PricePoint::new(date(2023, 1, 3), 3824.1),
        ]);
        let series = PeSeries::compute(&table(), &prices, EpsMode::Forward);
        assert_eq!(series.len(), 2);
        assert_eq!(series.records()[0].eps, None);
        assert_eq!(series.records()[0].pe_ratio, None);
        assert_relative_eq!(series.records()[0].price, 3839.5);
        assert!(series.records()[1].pe_ratio.is_some());
        assert_eq!(series.current().unwrap().date, date(2023, 1, 3));
        assert_eq!(series.available_ratios().len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        let series = PeSeries::compute(&EpsTable::new(), &PriceSeries::default(), EpsMode::Trailing);
        assert!(series.is_empty());
        assert!(series.current().is_none());
    }
}
