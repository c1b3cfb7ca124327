// src/returns.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{AlignedPrices, AnalysisError, PriceTable, ReturnTable, Symbol};

const MIN_RETURN_ROWS: usize = 2;

// Inner join on date: a date survives only if every series has a price on it.
// Dates missing from any one symbol are dropped for all of them.
pub fn align_prices(table: &PriceTable) -> Result<AlignedPrices, AnalysisError> {
    if table.is_empty() {
        return Err(AnalysisError::InsufficientData {
            stage: "price alignment",
            observations: 0,
        });
    }

    let mut series_iter = table.values();
    let mut common: Vec<NaiveDate> = match series_iter.next() {
        Some(first) => first.dates().copied().collect(),
        None => Vec::new(),
    };
    for series in series_iter {
        common.retain(|date| series.price_on(date).is_some());
    }

    let mut columns: BTreeMap<Symbol, Vec<f64>> = BTreeMap::new();
    for (symbol, series) in table {
        let column = common
            .iter()
            .filter_map(|date| series.price_on(date))
            .collect();
        columns.insert(symbol.clone(), column);
    }

    let longest = table.values().map(|s| s.len()).max().unwrap_or(0);
    if common.len() < longest {
        debug!(
            kept = common.len(),
            dropped = longest - common.len(),
            "Dropped dates without a price for every symbol"
        );
    }

    Ok(AlignedPrices {
        dates: common,
        columns,
    })
}

// Percent change between consecutive aligned dates. The first date has no
// prior price and is dropped.
pub fn build_returns(prices: &AlignedPrices) -> Result<ReturnTable, AnalysisError> {
    let rows = prices.len().saturating_sub(1);
    if rows < MIN_RETURN_ROWS {
        return Err(AnalysisError::InsufficientData {
            stage: "return series",
            observations: rows,
        });
    }

    let columns = prices
        .columns
        .iter()
        .map(|(symbol, column)| {
            let returns = column.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
            (symbol.clone(), returns)
        })
        .collect();

    Ok(ReturnTable {
        dates: prices.dates[1..].to_vec(),
        columns,
    })
}
