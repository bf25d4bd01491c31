#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/epsilon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod export;
pub mod summary;

pub use chart::{ChartError, NamedSeries, PePanel, render_pe_chart, render_time_series, save_svg};
pub use export::{ExportError, ExportFormat, Exporter};
pub use summary::ValuationSummary;
