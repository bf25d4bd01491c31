//! Quarter labels relative to a report date.

use chrono::NaiveDate;
use epsilon_data::QuarterLabel;

/// Quarter labels for offsets `start..=end` around the quarter of `report_date`.
///
/// Offset 0 is the report's own quarter; negative offsets reach back, positive
/// ones forward, wrapping across years. An empty range (`start > end`) yields
/// no labels.
///
/// ```
/// use chrono::NaiveDate;
/// use epsilon_valuation::quarter_range;
///
/// let report = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
/// let labels: Vec<String> = quarter_range(report, 0, 1)
///     .iter()
///     .map(ToString::to_string)
///     .collect();
/// assert_eq!(labels, vec!["Q4'24", "Q1'25"]);
/// ```
pub fn quarter_range(report_date: NaiveDate, start: i32, end: i32) -> Vec<QuarterLabel> {
    let base = QuarterLabel::from_date(report_date);
    (start..=end).map(|offset| base.offset(offset)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};
    use rstest::rstest;

    fn labels(date: NaiveDate, start: i32, end: i32) -> Vec<String> {
        quarter_range(date, start, end)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_forward_range() {
        assert_eq!(
            labels(date(2023, 1, 1), 0, 3),
            vec!["Q1'23", "Q2'23", "Q3'23", "Q4'23"]
        );
    }

    #[test]
    fn test_trailing_range_wraps_back() {
        assert_eq!(
            labels(date(2019, 2, 14), -4, -1),
            vec!["Q1'18", "Q2'18", "Q3'18", "Q4'18"]
        );
    }

    #[test]
    fn test_wrap_from_q4() {
        assert_eq!(labels(date(2024, 12, 20), 0, 1), vec!["Q4'24", "Q1'25"]);
    }

    #[test]
    fn test_century_wrap() {
        assert_eq!(labels(date(2099, 10, 1), 0, 1), vec!["Q4'99", "Q1'00"]);
    }

    #[rstest]
    #[case(0, 3)]
    #[case(-4, -1)]
    #[case(-8, 8)]
    #[case(2, 2)]
    fn test_length_matches_range(#[case] start: i32, #[case] end: i32) {
        let mut day = date(2015, 1, 1);
        while day < date(2026, 1, 1) {
            let range = quarter_range(day, start, end);
            assert_eq!(range.len(), (end - start + 1) as usize);
            assert_eq!(range[0], QuarterLabel::from_date(day).offset(start));
            for pair in range.windows(2) {
                assert_eq!(pair[0].offset(1), pair[1]);
                if pair[0].quarter() == 4 {
                    assert_eq!(pair[1].quarter(), 1);
                    assert_eq!(pair[1].year(), pair[0].year() + 1);
                }
            }
            day += Duration::days(17);
        }
    }

    #[test]
    fn test_empty_range() {
        assert!(quarter_range(date(2024, 5, 1), 1, 0).is_empty());
    }

    #[test]
    fn test_offset_zero_is_report_quarter() {
        let day = date(2021, 8, 31);
        let range = quarter_range(day, 0, 0);
        assert_eq!(range[0].quarter(), 3);
        assert_eq!(range[0].year(), day.year());
    }
}
