//! EPS estimate tables extracted from earnings reports.
//!
//! Each report contributes one row keyed by its filing date, with one cell per
//! calendar quarter it carries an estimate for.

pub mod table;
pub mod value;

pub use table::{EpsReport, EpsTable, REPORT_DATE_COLUMN, parse_report_date};
pub use value::EpsValue;
