//! Locating the EPS chart page inside a report.

use serde::{Deserialize, Serialize};

/// Chart titles used across report editions.
pub const DEFAULT_KEYWORDS: [&str; 3] = [
    "Bottom-Up EPS Estimates: Current & Historical",
    "Bottom-up EPS Estimates: Current & Historical",
    "Bottom-Up EPS: Current & Historical",
];

/// Distance from the top of the page (points) past which a title is considered
/// to sit at the bottom, with its chart on the following page.
pub const DEFAULT_BOTTOM_THRESHOLD: f64 = 700.0;

/// A word and its vertical position on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text.
    pub text: String,
    /// Distance of the word's top edge from the top of the page, in points.
    pub top: f64,
}

impl Word {
    /// Create a new word.
    pub fn new(text: impl Into<String>, top: f64) -> Self {
        Self {
            text: text.into(),
            top,
        }
    }
}

/// Words on one page, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    /// Words on the page.
    pub words: Vec<Word>,
}

impl PageText {
    /// Create a page from its words.
    pub const fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// Page text with words separated by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Finds the page that holds the EPS chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLocator {
    /// Chart titles to look for.
    pub keywords: Vec<String>,
    /// See [`DEFAULT_BOTTOM_THRESHOLD`].
    pub bottom_threshold: f64,
}

impl Default for ChartLocator {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            bottom_threshold: DEFAULT_BOTTOM_THRESHOLD,
        }
    }
}

impl ChartLocator {
    /// Index of the page to render, or `None` when no page mentions a keyword.
    ///
    /// The first page whose text contains a keyword wins. When that title sits
    /// below the bottom threshold the chart itself is on the next page, which is
    /// returned instead if it exists.
    pub fn locate(&self, pages: &[PageText]) -> Option<usize> {
        let leading: Vec<&str> = self
            .keywords
            .iter()
            .filter_map(|kw| kw.split_whitespace().next())
            .collect();

        let (idx, page) = pages.iter().enumerate().find(|(_, page)| {
            let text = page.text();
            self.keywords.iter().any(|kw| text.contains(kw.as_str()))
        })?;

        let at_bottom = page.words.iter().any(|w| {
            w.top > self.bottom_threshold && leading.iter().any(|t| w.text.contains(t))
        });

        if at_bottom && idx + 1 < pages.len() {
            Some(idx + 1)
        } else {
            Some(idx)
        }
    }
}
