#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/epsilon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod market;

// Re-export main types from sub-crates
pub use epsilon_data as data;
pub use epsilon_output as output;
pub use epsilon_valuation as valuation;

pub use market::{MarketData, MarketError, PriceSourceConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
