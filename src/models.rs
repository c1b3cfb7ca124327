// src/models.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::ValidationErrors;

pub type Symbol = String;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to fetch prices for {symbol}: {reason}")]
    DataFetch { symbol: Symbol, reason: String },

    #[error("insufficient data in {stage}: {observations} usable observations")]
    InsufficientData { stage: &'static str, observations: usize },

    #[error("cannot resolve date window: {0}")]
    DateResolution(String),

    #[error("regression input rejected for {symbol}: {reason}")]
    RegressionInput { symbol: Symbol, reason: String },

    #[error("summary schema mismatch: {symbol} has no {metric} score")]
    SchemaMismatch { symbol: Symbol, metric: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationErrors),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Adjusted closing prices for one symbol, ordered by date with no duplicates
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: Symbol,
    prices: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    // Builds a series from raw points. Later duplicates win and prices that
    // cannot produce a return (non-finite, zero, negative) are dropped.
    pub fn new<S, I>(symbol: S, points: I) -> Self
    where
        S: Into<Symbol>,
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let prices = points
            .into_iter()
            .filter(|(_, price)| price.is_finite() && *price > 0.0)
            .collect();

        PriceSeries {
            symbol: symbol.into(),
            prices,
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn price_on(&self, date: &NaiveDate) -> Option<f64> {
        self.prices.get(date).copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> + '_ {
        self.prices.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &f64)> + '_ {
        self.prices.iter()
    }
}

// Output of the market data provider, keyed by symbol
pub type PriceTable = BTreeMap<Symbol, PriceSeries>;

// A table of values for several symbols over one shared date index.
// Every column has exactly one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<Symbol, Vec<f64>>,
}

impl DatedTable {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.columns.get(symbol).map(|values| values.as_slice())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.columns.keys()
    }
}

// Prices inner-joined on date
pub type AlignedPrices = DatedTable;

// Daily percent changes between consecutive aligned dates
pub type ReturnTable = DatedTable;

// Per-asset output of the risk-adjusted model
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAdjusted {
    pub annual_return: f64,
    pub annual_volatility: Option<f64>,
    // None when the volatility is zero or could not be measured
    pub sharpe_like: Option<f64>,
}

// Per-asset output of the CAPM regression
#[derive(Debug, Clone, PartialEq)]
pub struct CapmFit {
    pub alpha: f64,
    pub beta: f64,
    pub r_squared: f64,
    pub score: f64,
}

// One row of the composite ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankRow {
    pub symbol: Symbol,
    pub total_return: f64,
    pub sharpe_like: Option<f64>,
    pub capm_score: f64,
    pub r_squared: f64,
    pub return_rank: f64,
    pub sharpe_rank: f64,
    pub capm_rank: f64,
    pub mean_rank: f64,
}
