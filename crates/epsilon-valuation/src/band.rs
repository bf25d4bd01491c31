//! Mean ± kσ bands over a valuation series.

use crate::error::ValuationError;
use chrono::NaiveDate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default band width in standard deviations.
pub const DEFAULT_SIGMA: f64 = 1.5;

/// Side of the band a region lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Strictly above `mean + kσ`.
    Overvalued,
    /// Strictly below `mean - kσ`.
    Undervalued,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overvalued => f.write_str("overvalued"),
            Self::Undervalued => f.write_str("undervalued"),
        }
    }
}

/// A maximal run of consecutive points on one side of the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRegion {
    /// Side of the band.
    pub kind: RegionKind,
    /// First date of the run.
    pub start: NaiveDate,
    /// Last date of the run, inclusive.
    pub end: NaiveDate,
}

/// Band thresholds and the regions that fall outside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAnalysis {
    /// Band width in standard deviations.
    pub k: f64,
    /// Mean of the available values.
    pub mean: f64,
    /// Population standard deviation of the available values.
    pub std_dev: f64,
    /// `mean + k * std_dev`
    pub upper: f64,
    /// `mean - k * std_dev`
    pub lower: f64,
    /// Regions ordered by start date.
    pub regions: Vec<BandRegion>,
}

impl BandAnalysis {
    /// Which side of the band `value` falls on, if outside it.
    pub fn classify(&self, value: f64) -> Option<RegionKind> {
        if value > self.upper {
            Some(RegionKind::Overvalued)
        } else if value < self.lower {
            Some(RegionKind::Undervalued)
        } else {
            None
        }
    }

    /// Regions of one kind.
    pub fn regions_of(&self, kind: RegionKind) -> impl Iterator<Item = &BandRegion> + '_ {
        self.regions.iter().filter(move |r| r.kind == kind)
    }
}

/// Computes [`BandAnalysis`] for a dated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaBands {
    k: f64,
}

impl Default for SigmaBands {
    fn default() -> Self {
        Self { k: DEFAULT_SIGMA }
    }
}

impl SigmaBands {
    /// Create a bander `k` standard deviations wide.
    ///
    /// # Errors
    ///
    /// [`ValuationError::InvalidSigma`] when `k` is negative or not finite.
    pub fn new(k: f64) -> Result<Self, ValuationError> {
        if !k.is_finite() || k < 0.0 {
            return Err(ValuationError::InvalidSigma(k));
        }
        Ok(Self { k })
    }

    /// Band width in standard deviations.
    pub const fn k(&self) -> f64 {
        self.k
    }

    /// Band `points`, which must be in ascending date order.
    ///
    /// Statistics use the available values only. An unavailable point ends any
    /// open region at the point before it.
    ///
    /// # Returns
    ///
    /// `None` when no value is available.
    pub fn compute(&self, points: &[(NaiveDate, Option<f64>)]) -> Option<BandAnalysis> {
        let values: Vec<f64> = points
            .iter()
            .filter_map(|(_, v)| *v)
            .filter(|v| v.is_finite())
            .collect();
        let first = *values.first()?;

        let (mean, std_dev) = if values.iter().all(|v| *v == first) {
            (first, 0.0)
        } else {
            let arr = Array1::from_vec(values);
            (arr.mean()?, arr.std(0.0))
        };

        let mut analysis = BandAnalysis {
            k: self.k,
            mean,
            std_dev,
            upper: mean + self.k * std_dev,
            lower: mean - self.k * std_dev,
            regions: Vec::new(),
        };
        analysis.regions = find_regions(&analysis, points);
        Some(analysis)
    }
}

fn find_regions(analysis: &BandAnalysis, points: &[(NaiveDate, Option<f64>)]) -> Vec<BandRegion> {
    let mut regions = Vec::new();
    let mut over: Option<NaiveDate> = None;
    let mut under: Option<NaiveDate> = None;
    let mut previous: Option<NaiveDate> = None;

    for &(date, value) in points {
        let kind = value
            .filter(|v| v.is_finite())
            .and_then(|v| analysis.classify(v));

        for (open, side) in [
            (&mut over, RegionKind::Overvalued),
            (&mut under, RegionKind::Undervalued),
        ] {
            match (*open, kind == Some(side)) {
                (None, true) => *open = Some(date),
                (Some(start), false) => {
                    regions.push(BandRegion {
                        kind: side,
                        start,
                        end: previous.unwrap_or(start),
                    });
                    *open = None;
                }
                _ => {}
            }
        }
        previous = Some(date);
    }

    if let Some(end) = previous {
        for (open, side) in [(over, RegionKind::Overvalued), (under, RegionKind::Undervalued)] {
            if let Some(start) = open {
                regions.push(BandRegion {
                    kind: side,
                    start,
                    end,
                });
            }
        }
    }

    regions.sort_by_key(|r| r.start);
    regions
}
