//! A single EPS cell.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Marker appended to figures restated by a later filing.
pub const RESTATED_MARKER: char = '*';

/// An EPS figure as read from an estimates table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum EpsValue {
    /// A plain estimate.
    Value(f64),
    /// A figure flagged as restated.
    Restated(f64),
    /// No usable figure.
    #[default]
    Unavailable,
}

impl EpsValue {
    /// Parse a raw table cell.
    ///
    /// Only annotation characters (the restated marker, `$`, thousands
    /// separators and whitespace) are stripped before the number is read, so
    /// `"52.3*"` becomes `Restated(52.3)` and `" $1,050.1 "` becomes
    /// `Value(1050.1)`. A Unicode minus sign and an accounting `(3.5)` are both
    /// negative. Empty cells, `NaN`-like placeholders and cells with any other
    /// text are `Unavailable`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || ["nan", "na", "n/a", "none", "null"]
                .iter()
                .any(|p| trimmed.eq_ignore_ascii_case(p))
        {
            return Self::Unavailable;
        }

        let restated = trimmed.contains(RESTATED_MARKER);
        let cleaned: String = trimmed
            .chars()
            .filter(|c| !matches!(*c, RESTATED_MARKER | '$' | ',') && !c.is_whitespace())
            .map(|c| if c == '\u{2212}' { '-' } else { c })
            .collect();

        match parse_number(&cleaned) {
            Some(v) if restated => Self::Restated(v),
            Some(v) => Self::Value(v),
            None => {
                debug!(cell = raw, "unparseable EPS cell treated as unavailable");
                Self::Unavailable
            }
        }
    }

    /// The numeric figure, if any.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) | Self::Restated(v) => Some(*v),
            Self::Unavailable => None,
        }
    }

    /// Whether a figure is present.
    pub const fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Whether the figure carries the restated marker.
    pub const fn is_restated(&self) -> bool {
        matches!(self, Self::Restated(_))
    }
}

/// A plain decimal, or a parenthesised one read as negative.
fn parse_number(text: &str) -> Option<f64> {
    let (body, sign) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner, -1.0),
        None => (text, 1.0),
    };
    let plain = !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if !plain {
        return None;
    }
    body.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| sign * v)
}

impl fmt::Display for EpsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::Restated(v) => write!(f, "{}{}", v, RESTATED_MARKER),
            Self::Unavailable => Ok(()),
        }
    }
}
