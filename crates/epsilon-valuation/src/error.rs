//! Error types for valuation computations.

use thiserror::Error;

/// Errors raised by valuation configuration.
///
/// Sparse or unusable EPS data is never an error; it shows up as `None` in the
/// computed series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValuationError {
    /// EPS mode string is neither `forward` nor `trailing`
    #[error("Invalid EPS mode '{0}': expected 'forward' or 'trailing'")]
    InvalidMode(String),

    /// Band width is negative or not finite
    #[error("Invalid sigma multiplier {0}: must be finite and non-negative")]
    InvalidSigma(f64),
}
