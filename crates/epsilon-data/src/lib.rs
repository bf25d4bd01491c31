#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/epsilon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod documents;
pub mod eps;
pub mod error;
pub mod prices;
pub mod quarter;
pub mod yahoo;

pub use eps::{EpsReport, EpsTable, EpsValue};
pub use error::{DataError, Result};
pub use prices::{PricePoint, PriceSeries};
pub use quarter::QuarterLabel;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
