#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/epsilon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod band;
pub mod error;
pub mod quarter;
pub mod ratio;

pub use aggregate::{EpsAggregator, EpsMode};
pub use band::{BandAnalysis, BandRegion, DEFAULT_SIGMA, RegionKind, SigmaBands};
pub use error::ValuationError;
pub use quarter::quarter_range;
pub use ratio::{PeRecord, PeSeries};
