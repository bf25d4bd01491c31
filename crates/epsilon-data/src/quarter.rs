//! Calendar quarter labels such as `Q1'24`.
//!
//! EPS tables key their columns by these labels. Only the last two digits of the
//! year are written, so parsed labels are placed in the 2000-2099 century.

use crate::error::DataError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar quarter identified by year and quarter number (1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuarterLabel {
    year: i32,
    quarter: u8,
}

impl QuarterLabel {
    /// Create a label, returning `None` when `quarter` is outside 1..=4.
    pub const fn new(year: i32, quarter: u8) -> Option<Self> {
        if quarter >= 1 && quarter <= 4 {
            Some(Self { year, quarter })
        } else {
            None
        }
    }

    /// The quarter containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month0() / 3 + 1) as u8,
        }
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Quarter number, 1 through 4.
    pub const fn quarter(&self) -> u8 {
        self.quarter
    }

    /// Shift by `quarters`, wrapping across year boundaries in either direction.
    pub const fn offset(&self, quarters: i32) -> Self {
        let total = self.year * 4 + (self.quarter as i32 - 1) + quarters;
        Self {
            year: total.div_euclid(4),
            quarter: (total.rem_euclid(4) + 1) as u8,
        }
    }
}

impl fmt::Display for QuarterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}'{:02}", self.quarter, self.year.rem_euclid(100))
    }
}

impl FromStr for QuarterLabel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DataError::InvalidQuarter(s.to_string());
        let trimmed = s.trim();

        let rest = trimmed.strip_prefix('Q').ok_or_else(invalid)?;
        let (quarter, year) = rest.split_once('\'').ok_or_else(invalid)?;

        if year.len() != 2 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let quarter: u8 = quarter.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;

        Self::new(2000 + year, quarter).ok_or_else(invalid)
    }
}

impl Serialize for QuarterLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuarterLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(2024, 1, 1), 1)]
    #[case(date(2024, 3, 31), 1)]
    #[case(date(2024, 4, 1), 2)]
    #[case(date(2024, 9, 30), 3)]
    #[case(date(2024, 12, 31), 4)]
    fn test_from_date(#[case] d: NaiveDate, #[case] quarter: u8) {
        let label = QuarterLabel::from_date(d);
        assert_eq!(label.quarter(), quarter);
        assert_eq!(label.year(), 2024);
    }

    #[rstest]
    #[case(1, "Q1'25")]
    #[case(4, "Q4'25")]
    #[case(-1, "Q3'24")]
    #[case(-4, "Q4'23")]
    #[case(-5, "Q3'23")]
    #[case(0, "Q4'24")]
    fn test_offset_wraps_years(#[case] offset: i32, #[case] expected: &str) {
        let q4 = QuarterLabel::new(2024, 4).unwrap();
        assert_eq!(q4.offset(offset).to_string(), expected);
    }

    #[test]
    fn test_display_pads_year() {
        let label = QuarterLabel::new(2007, 2).unwrap();
        assert_eq!(label.to_string(), "Q2'07");
    }

    #[test]
    fn test_parse() {
        let label: QuarterLabel = "Q3'19".parse().unwrap();
        assert_eq!(label, QuarterLabel::new(2019, 3).unwrap());

        let padded: QuarterLabel = " Q1'24 ".parse().unwrap();
        assert_eq!(padded.to_string(), "Q1'24");
    }

    #[rstest]
    #[case("Report_Date")]
    #[case("Q5'24")]
    #[case("Q0'24")]
    #[case("Q1'2024")]
    #[case("Q1-24")]
    #[case("")]
    fn test_parse_rejects(#[case] text: &str) {
        assert!(matches!(
            text.parse::<QuarterLabel>(),
            Err(DataError::InvalidQuarter(_))
        ));
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut labels = vec![
            QuarterLabel::new(2025, 1).unwrap(),
            QuarterLabel::new(2024, 4).unwrap(),
            QuarterLabel::new(2024, 2).unwrap(),
        ];
        labels.sort();
        let text: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["Q2'24", "Q4'24", "Q1'25"]);
    }
}
