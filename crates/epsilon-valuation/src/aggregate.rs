//! Four-quarter EPS aggregation.
//!
//! The EPS for a date is the sum of four quarterly estimates. Forward EPS uses
//! the quarter of the governing report and the three after it; trailing EPS uses
//! the four quarters before it. The governing report is the latest one dated on
//! or before the query date, and a quarter's value is taken from the most recent
//! report up to that date that carries it, so later revisions win.

use crate::error::ValuationError;
use crate::quarter::quarter_range;
use chrono::NaiveDate;
use epsilon_data::{EpsTable, QuarterLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which four quarters make up the EPS sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpsMode {
    /// `Q(0)+Q(1)+Q(2)+Q(3)`
    Forward,
    /// `Q(-4)+Q(-3)+Q(-2)+Q(-1)`
    Trailing,
}

impl EpsMode {
    /// Both modes, in chart panel order.
    pub const ALL: [Self; 2] = [Self::Trailing, Self::Forward];

    /// Inclusive quarter offsets relative to the governing report's quarter.
    pub const fn offsets(&self) -> (i32, i32) {
        match self {
            Self::Forward => (0, 3),
            Self::Trailing => (-4, -1),
        }
    }

    /// Lowercase identifier used on the command line and in exports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Trailing => "trailing",
        }
    }

    /// Quarter formula shown in chart titles.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Forward => "Q(0)+Q(1)+Q(2)+Q(3)",
            Self::Trailing => "Q(-4)+Q(-3)+Q(-2)+Q(-1)",
        }
    }
}

impl fmt::Display for EpsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpsMode {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(Self::Forward),
            "trailing" => Ok(Self::Trailing),
            _ => Err(ValuationError::InvalidMode(s.to_string())),
        }
    }
}

/// Computes four-quarter EPS sums from an estimate table.
#[derive(Debug, Clone, Copy)]
pub struct EpsAggregator<'a> {
    table: &'a EpsTable,
}

impl<'a> EpsAggregator<'a> {
    /// Create an aggregator over `table`.
    pub const fn new(table: &'a EpsTable) -> Self {
        Self { table }
    }

    /// Quarters summed for `date`, or `None` before the first report.
    pub fn quarters_for(&self, date: NaiveDate, mode: EpsMode) -> Option<Vec<QuarterLabel>> {
        let anchor = self.table.reports_on_or_before(date).last()?;
        let (start, end) = mode.offsets();
        Some(quarter_range(anchor.report_date, start, end))
    }

    /// Four-quarter EPS sum for `date`.
    ///
    /// # Returns
    ///
    /// `None` when no report precedes `date`, when any of the four quarters has
    /// no value in any report up to `date`, or when the sum is not positive.
    pub fn eps_at(&self, date: NaiveDate, mode: EpsMode) -> Option<f64> {
        let reports = self.table.reports_on_or_before(date);
        let anchor = reports.last()?;
        let (start, end) = mode.offsets();

        let mut total = 0.0;
        for quarter in quarter_range(anchor.report_date, start, end) {
            let value = reports
                .iter()
                .rev()
                .find_map(|report| report.value(quarter).as_f64())?;
            total += value;
        }

        (total > 0.0).then_some(total)
    }

    /// EPS sums for each of `dates`.
    pub fn eps_series(&self, dates: &[NaiveDate], mode: EpsMode) -> Vec<Option<f64>> {
        dates.iter().map(|&date| self.eps_at(date, mode)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use epsilon_data::{EpsReport, EpsValue};
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn q(label: &str) -> QuarterLabel {
        label.parse().unwrap()
    }

    fn report(on: NaiveDate, values: &[(&str, f64)]) -> EpsReport {
        values.iter().fold(EpsReport::new(on), |r, (label, v)| {
            r.with_value(q(label), EpsValue::Value(*v))
        })
    }

    fn sample_table() -> EpsTable {
        EpsTable::from_reports([report(
            date(2023, 1, 1),
            &[
                ("Q1'22", 48.0),
                ("Q2'22", 49.0),
                ("Q3'22", 50.0),
                ("Q4'22", 51.0),
                ("Q1'23", 50.0),
                ("Q2'23", 51.0),
                ("Q3'23", 52.0),
                ("Q4'23", 53.0),
            ],
        )])
    }

    #[rstest]
    #[case("forward", EpsMode::Forward)]
    #[case("FORWARD", EpsMode::Forward)]
    #[case(" Trailing ", EpsMode::Trailing)]
    fn test_mode_from_str(#[case] input: &str, #[case] expected: EpsMode) {
        assert_eq!(input.parse::<EpsMode>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_mode() {
        assert_eq!(
            "ttm".parse::<EpsMode>(),
            Err(ValuationError::InvalidMode("ttm".to_string()))
        );
    }

    #[test]
    fn test_mode_labels() {
        assert_eq!(EpsMode::Forward.label(), "Q(0)+Q(1)+Q(2)+Q(3)");
        assert_eq!(EpsMode::Trailing.label(), "Q(-4)+Q(-3)+Q(-2)+Q(-1)");
        assert_eq!(EpsMode::Trailing.to_string(), "trailing");
    }

    #[test]
    fn test_forward_sum() {
        let table = sample_table();
        let eps = EpsAggregator::new(&table).eps_at(date(2023, 6, 1), EpsMode::Forward);
        assert_relative_eq!(eps.unwrap(), 206.0);
    }

    #[test]
    fn test_trailing_sum() {
        let table = sample_table();
        let eps = EpsAggregator::new(&table).eps_at(date(2023, 6, 1), EpsMode::Trailing);
        assert_relative_eq!(eps.unwrap(), 198.0);
    }

    #[test]
    fn test_before_first_report() {
        let table = sample_table();
        let agg = EpsAggregator::new(&table);
        assert_eq!(agg.eps_at(date(2022, 12, 31), EpsMode::Forward), None);
        assert_eq!(agg.quarters_for(date(2022, 12, 31), EpsMode::Forward), None);
    }

    #[test]
    fn test_missing_quarter_is_unavailable() {
        let table = EpsTable::from_reports([report(
            date(2023, 1, 1),
            &[("Q1'23", 50.0), ("Q2'23", 51.0), ("Q3'23", 52.0)],
        )]);
        let eps = EpsAggregator::new(&table).eps_at(date(2023, 2, 1), EpsMode::Forward);
        assert_eq!(eps, None);
    }

    #[test]
    fn test_non_positive_sum_is_unavailable() {
        let table = EpsTable::from_reports([report(
            date(2020, 4, 3),
            &[
                ("Q2'20", -10.0),
                ("Q3'20", 2.0),
                ("Q4'20", 4.0),
                ("Q1'21", 4.0),
            ],
        )]);
        let eps = EpsAggregator::new(&table).eps_at(date(2020, 4, 3), EpsMode::Forward);
        assert_eq!(eps, None);
    }

    #[test]
    fn test_later_revision_wins() {
        let table = EpsTable::from_reports([
            report(
                date(2023, 1, 6),
                &[
                    ("Q1'23", 50.0),
                    ("Q2'23", 51.0),
                    ("Q3'23", 52.0),
                    ("Q4'23", 53.0),
                ],
            ),
            report(date(2023, 1, 13), &[("Q1'23", 49.0)]),
        ]);
        let agg = EpsAggregator::new(&table);
        assert_relative_eq!(agg.eps_at(date(2023, 1, 10), EpsMode::Forward).unwrap(), 206.0);
        assert_relative_eq!(agg.eps_at(date(2023, 1, 20), EpsMode::Forward).unwrap(), 205.0);
    }

    #[test]
    fn test_future_reports_are_ignored() {
        let table = EpsTable::from_reports([
            report(
                date(2023, 1, 6),
                &[
                    ("Q1'23", 50.0),
                    ("Q2'23", 51.0),
                    ("Q3'23", 52.0),
                    ("Q4'23", 53.0),
                ],
            ),
            report(date(2023, 3, 3), &[("Q1'23", 10.0)]),
        ]);
        let eps = EpsAggregator::new(&table).eps_at(date(2023, 2, 1), EpsMode::Forward);
        assert_relative_eq!(eps.unwrap(), 206.0);
    }

    #[test]
    fn test_quarters_follow_governing_report() {
        let table = EpsTable::from_reports([report(date(2024, 3, 29), &[])]);
        let quarters = EpsAggregator::new(&table)
            .quarters_for(date(2024, 4, 2), EpsMode::Forward)
            .unwrap();
        assert_eq!(quarters[0], q("Q1'24"));
        assert_eq!(quarters[3], q("Q4'24"));
    }

    #[test]
    fn test_eps_series_is_idempotent() {
        let table = sample_table();
        let agg = EpsAggregator::new(&table);
        let dates = vec![date(2022, 12, 1), date(2023, 1, 1), date(2023, 9, 30)];
        let first = agg.eps_series(&dates, EpsMode::Forward);
        let second = agg.eps_series(&dates, EpsMode::Forward);
        assert_eq!(first, second);
        assert_eq!(first[0], None);
        assert_eq!(first[1], Some(206.0));
    }
}
