//! Valuation summary for terminal and Markdown output.
//!
//! Combines the latest available P/E reading with the band statistics of the
//! whole series so the current valuation can be read against its history.

use chrono::NaiveDate;
use epsilon_valuation::{BandAnalysis, EpsMode, PeRecord, PeSeries, RegionKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current valuation and its historical context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValuationSummary {
    /// Index or security symbol.
    pub symbol: String,

    /// EPS mode of the underlying series.
    pub mode: EpsMode,

    /// First price date in the series.
    pub period_start: Option<NaiveDate>,

    /// Last price date in the series.
    pub period_end: Option<NaiveDate>,

    /// Number of price observations.
    pub observations: usize,

    /// Number of observations with an available P/E.
    pub available: usize,

    /// Latest record with an available P/E.
    pub current: Option<PeRecord>,

    /// Band statistics over the series.
    pub bands: Option<BandAnalysis>,
}

impl ValuationSummary {
    /// Summarise a P/E series and its bands.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol shown in headings
    /// * `series` - The P/E series
    /// * `bands` - Band analysis of `series`, if one could be computed
    pub fn new(symbol: impl Into<String>, series: &PeSeries, bands: Option<BandAnalysis>) -> Self {
        let records = series.records();
        Self {
            symbol: symbol.into(),
            mode: series.mode(),
            period_start: records.first().map(|r| r.date),
            period_end: records.last().map(|r| r.date),
            observations: records.len(),
            available: records.iter().filter(|r| r.pe_ratio.is_some()).count(),
            current: series.current().copied(),
            bands,
        }
    }

    /// Current P/E in standard deviations from the mean.
    ///
    /// `None` without a current reading, without bands, or when the series
    /// has no dispersion.
    pub fn z_score(&self) -> Option<f64> {
        let pe = self.current?.pe_ratio?;
        let bands = self.bands.as_ref()?;
        (bands.std_dev > 0.0).then(|| (pe - bands.mean) / bands.std_dev)
    }

    /// Band side of the current reading, `None` when inside the band.
    pub fn position(&self) -> Option<RegionKind> {
        let pe = self.current?.pe_ratio?;
        self.bands.as_ref()?.classify(pe)
    }

    fn position_label(&self) -> &'static str {
        match (self.current.is_some(), self.bands.is_some(), self.position()) {
            (false, _, _) | (_, false, _) => "n/a",
            (_, _, Some(RegionKind::Overvalued)) => "Overvalued",
            (_, _, Some(RegionKind::Undervalued)) => "Undervalued",
            (_, _, None) => "Within band",
        }
    }

    fn period_label(&self) -> String {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no data".to_string(),
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\nValuation Summary: {} ({} EPS, {})\n",
            self.symbol,
            self.mode,
            self.mode.label()
        ));
        output.push_str(&format!("Period: {}\n", self.period_label()));
        output.push_str(&"=".repeat(80));
        output.push('\n');

        output.push_str("\nCurrent Reading:\n");
        output.push_str(&"-".repeat(80));
        output.push('\n');
        match &self.current {
            Some(record) => {
                output.push_str(&format!("  Date:                     {}\n", record.date));
                output.push_str(&format!("  Price:                    {:.2}\n", record.price));
                if let Some(eps) = record.eps {
                    output.push_str(&format!("  EPS:                      {:.2}\n", eps));
                }
                if let Some(pe) = record.pe_ratio {
                    output.push_str(&format!("  P/E:                      {:.2}\n", pe));
                }
                if let Some(z) = self.z_score() {
                    output.push_str(&format!("  Z-Score:                  {:+.2}\n", z));
                }
                output.push_str(&format!(
                    "  Position:                 {}\n",
                    self.position_label()
                ));
            }
            None => output.push_str("  No P/E available\n"),
        }
        output.push_str(&format!(
            "  Coverage:                 {} of {} days\n",
            self.available, self.observations
        ));

        if let Some(bands) = &self.bands {
            output.push_str(&format!("\nHistorical Bands (k = {}):\n", bands.k));
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!("  Mean:                     {:.2}\n", bands.mean));
            output.push_str(&format!("  Std Dev:                  {:.2}\n", bands.std_dev));
            output.push_str(&format!(
                "  {:<24}{:.2}\n",
                format!("Upper (+{}σ):", bands.k),
                bands.upper
            ));
            output.push_str(&format!(
                "  {:<24}{:.2}\n",
                format!("Lower (-{}σ):", bands.k),
                bands.lower
            ));

            if !bands.regions.is_empty() {
                output.push_str("\nRegions:\n");
                output.push_str(&"-".repeat(80));
                output.push('\n');
                output.push_str(&format!(
                    "{:<14} {:>12} {:>12}\n",
                    "Kind", "Start", "End"
                ));
                for region in &bands.regions {
                    output.push_str(&format!(
                        "{:<14} {:>12} {:>12}\n",
                        region.kind.to_string(),
                        region.start.to_string(),
                        region.end.to_string()
                    ));
                }
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');

        output
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Valuation Summary: {}\n\n", self.symbol));
        output.push_str(&format!(
            "**Mode:** {} (`{}`)\n\n",
            self.mode,
            self.mode.label()
        ));
        output.push_str(&format!("**Period:** {}\n\n", self.period_label()));

        output.push_str("## Current Reading\n\n");
        match &self.current {
            Some(record) => {
                output.push_str(&format!("- **Date:** {}\n", record.date));
                output.push_str(&format!("- **Price:** {:.2}\n", record.price));
                if let Some(eps) = record.eps {
                    output.push_str(&format!("- **EPS:** {:.2}\n", eps));
                }
                if let Some(pe) = record.pe_ratio {
                    output.push_str(&format!("- **P/E:** {:.2}\n", pe));
                }
                if let Some(z) = self.z_score() {
                    output.push_str(&format!("- **Z-Score:** {:+.2}\n", z));
                }
                output.push_str(&format!("- **Position:** {}\n", self.position_label()));
            }
            None => output.push_str("No P/E available.\n"),
        }
        output.push('\n');

        if let Some(bands) = &self.bands {
            output.push_str("## Historical Bands\n\n");
            output.push_str("| Mean | Std Dev | k | Upper | Lower |\n");
            output.push_str("|------|---------|---|-------|-------|\n");
            output.push_str(&format!(
                "| {:.2} | {:.2} | {} | {:.2} | {:.2} |\n\n",
                bands.mean, bands.std_dev, bands.k, bands.upper, bands.lower
            ));

            if !bands.regions.is_empty() {
                output.push_str("## Regions\n\n");
                output.push_str("| Kind | Start | End |\n");
                output.push_str("|------|-------|-----|\n");
                for region in &bands.regions {
                    output.push_str(&format!(
                        "| {} | {} | {} |\n",
                        region.kind, region.start, region.end
                    ));
                }
            }
        }

        output
    }
}

impl fmt::Display for ValuationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Valuation Summary: {} {} ({})",
            self.symbol,
            self.mode,
            self.period_label()
        )?;
        match self.current.as_ref().and_then(|r| r.pe_ratio.map(|pe| (r, pe))) {
            Some((record, pe)) => writeln!(f, "  P/E on {}: {:.2}", record.date, pe)?,
            None => writeln!(f, "  P/E: n/a")?,
        }
        if let Some(bands) = &self.bands {
            writeln!(
                f,
                "  Mean: {:.2}  Band: [{:.2}, {:.2}]  Regions: {}",
                bands.mean,
                bands.lower,
                bands.upper,
                bands.regions.len()
            )?;
        }
        writeln!(f, "  Position: {}", self.position_label())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use epsilon_data::{EpsReport, EpsTable, EpsValue, PricePoint, PriceSeries};
    use epsilon_valuation::SigmaBands;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(prices: &[(u32, f64)]) -> PeSeries {
        let report = ["Q1'24", "Q2'24", "Q3'24", "Q4'24"]
            .iter()
            .fold(EpsReport::new(date(2024, 1, 1)), |r, label| {
                r.with_value(label.parse().unwrap(), EpsValue::Value(25.0))
            });
        let table = EpsTable::from_reports([report]);
        let points = prices
            .iter()
            .map(|(day, price)| PricePoint::new(date(2024, 1, *day), *price))
            .collect();
        PeSeries::compute(&table, &PriceSeries::new(points), EpsMode::Forward)
    }

    #[test]
    fn test_summary_fields() {
        let series = series(&[(2, 1800.0), (3, 2000.0), (4, 2200.0), (5, 3000.0)]);
        let bands = SigmaBands::new(1.0).unwrap().compute(&series.ratio_points());
        let summary = ValuationSummary::new("^GSPC", &series, bands);

        assert_eq!(summary.observations, 4);
        assert_eq!(summary.available, 4);
        assert_eq!(summary.period_start, Some(date(2024, 1, 2)));
        assert_relative_eq!(summary.current.unwrap().pe_ratio.unwrap(), 30.0);
        assert_eq!(summary.position(), Some(RegionKind::Overvalued));
        assert!(summary.z_score().unwrap() > 1.0);
    }

    #[test]
    fn test_ascii_and_markdown() {
        let series = series(&[(2, 1800.0), (3, 2000.0), (4, 2200.0), (5, 3000.0)]);
        let bands = SigmaBands::new(1.0).unwrap().compute(&series.ratio_points());
        let summary = ValuationSummary::new("^GSPC", &series, bands);

        let ascii = summary.to_ascii_table();
        assert!(ascii.contains("Valuation Summary: ^GSPC"));
        assert!(ascii.contains("P/E:                      30.00"));
        assert!(ascii.contains("Overvalued"));
        assert!(ascii.contains("Regions:"));

        let markdown = summary.to_markdown();
        assert!(markdown.contains("# Valuation Summary: ^GSPC"));
        assert!(markdown.contains("| Kind | Start | End |"));
        assert!(markdown.contains("| overvalued | 2024-01-05 | 2024-01-05 |"));

        let display = summary.to_string();
        assert!(display.contains("P/E on 2024-01-05: 30.00"));
    }

    #[test]
    fn test_summary_without_data() {
        let empty = PeSeries::compute(&EpsTable::new(), &PriceSeries::default(), EpsMode::Trailing);
        let summary = ValuationSummary::new("^GSPC", &empty, None);
        assert!(summary.current.is_none());
        assert!(summary.z_score().is_none());
        assert!(summary.to_ascii_table().contains("No P/E available"));
        assert!(summary.to_string().contains("P/E: n/a"));
        assert!(summary.to_string().contains("Position: n/a"));
    }
}
