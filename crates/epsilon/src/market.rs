//! Loaded market data and the valuation pipeline over it.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use epsilon_data::yahoo::{DEFAULT_INDEX_SYMBOL, YahooQuoteProvider};
use epsilon_data::{DataError, EpsTable, PriceSeries};
use epsilon_valuation::{
    BandAnalysis, EpsAggregator, EpsMode, PeRecord, PeSeries, SigmaBands, ValuationError,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading market data.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Reading the EPS table or fetching prices failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The EPS table has no reports, so there is no price range to fetch.
    #[error("EPS table {0} has no reports")]
    EmptyTable(PathBuf),
}

/// Where daily prices come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSourceConfig {
    /// Symbol fetched from Yahoo Finance.
    pub symbol: String,
    /// Local `Date,Price` CSV used instead of Yahoo when set.
    pub prices_path: Option<PathBuf>,
    /// Last day of the fetched history; today when unset.
    pub end: Option<NaiveDate>,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_INDEX_SYMBOL.to_string(),
            prices_path: None,
            end: None,
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// An EPS table and a price series, with the EPS mode used for valuation.
///
/// Computations borrow the loaded data; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct MarketData {
    symbol: String,
    eps: EpsTable,
    prices: PriceSeries,
    mode: EpsMode,
}

impl MarketData {
    /// Wrap already loaded data. The mode defaults to [`EpsMode::Forward`].
    pub fn new(eps: EpsTable, prices: PriceSeries) -> Self {
        Self {
            symbol: DEFAULT_INDEX_SYMBOL.to_string(),
            eps,
            prices,
            mode: EpsMode::Forward,
        }
    }

    /// Load the EPS table at `eps_path` and the matching price history.
    ///
    /// Prices come from `config.prices_path` when set, otherwise from Yahoo
    /// Finance for `config.symbol` from the first report date to `config.end`.
    pub async fn load(
        eps_path: impl AsRef<Path>,
        config: &PriceSourceConfig,
    ) -> Result<Self, MarketError> {
        let eps_path = eps_path.as_ref();
        let eps = EpsTable::from_path(eps_path)?;

        let prices = match &config.prices_path {
            Some(path) => PriceSeries::from_csv_path(path)?,
            None => {
                let first = eps
                    .first_report_date()
                    .ok_or_else(|| MarketError::EmptyTable(eps_path.to_path_buf()))?;
                let end = config.end.map(start_of_day).unwrap_or_else(Utc::now);
                let provider = YahooQuoteProvider::new()?;
                provider
                    .fetch_price_series(&config.symbol, start_of_day(first), end)
                    .await?
            }
        };

        info!(
            symbol = %config.symbol,
            reports = eps.len(),
            prices = prices.len(),
            "loaded market data"
        );

        Ok(Self::new(eps, prices).with_symbol(config.symbol.clone()))
    }

    /// Set the symbol the prices belong to.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Set the EPS mode.
    pub fn with_mode(mut self, mode: EpsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Change the EPS mode.
    pub const fn set_mode(&mut self, mode: EpsMode) {
        self.mode = mode;
    }

    /// Current EPS mode.
    pub const fn mode(&self) -> EpsMode {
        self.mode
    }

    /// Symbol the prices belong to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The EPS table.
    pub const fn eps_table(&self) -> &EpsTable {
        &self.eps
    }

    /// The price series.
    pub const fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    /// Four-quarter EPS on `date` in the current mode.
    pub fn eps_at(&self, date: NaiveDate) -> Option<f64> {
        EpsAggregator::new(&self.eps).eps_at(date, self.mode)
    }

    /// Four-quarter EPS on every price date in the current mode.
    pub fn eps(&self) -> Vec<(NaiveDate, Option<f64>)> {
        let dates = self.prices.dates();
        let values = EpsAggregator::new(&self.eps).eps_series(&dates, self.mode);
        dates.into_iter().zip(values).collect()
    }

    /// The P/E series in the current mode.
    pub fn pe_ratio(&self) -> PeSeries {
        PeSeries::compute(&self.eps, &self.prices, self.mode)
    }

    /// P/E series for both modes, trailing first.
    pub fn pe_ratios(&self) -> Vec<PeSeries> {
        EpsMode::ALL
            .iter()
            .map(|mode| PeSeries::compute(&self.eps, &self.prices, *mode))
            .collect()
    }

    /// The latest record with an available P/E.
    pub fn current_pe(&self) -> Option<PeRecord> {
        self.pe_ratio().current().copied()
    }

    /// Bands of the P/E series at `k` standard deviations.
    ///
    /// `Ok(None)` when no P/E is available.
    pub fn bands(&self, k: f64) -> Result<Option<BandAnalysis>, ValuationError> {
        let bander = SigmaBands::new(k)?;
        Ok(bander.compute(&self.pe_ratio().ratio_points()))
    }
}
