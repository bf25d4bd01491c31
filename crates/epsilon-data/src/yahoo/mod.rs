//! Yahoo Finance price provider.

pub mod quotes;

pub use quotes::{DEFAULT_INDEX_SYMBOL, YahooQuoteProvider};
