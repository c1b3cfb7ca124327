// src/cumulative.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{AlignedPrices, AnalysisError, Symbol};

// Result of Model A: the trading days actually used and the percent return
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeReturns {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_return: BTreeMap<Symbol, f64>,
}

// Index of the trading date closest to `target`. On an exact tie between the
// date before and the date after, the earlier one is returned.
pub fn nearest_date_index(dates: &[NaiveDate], target: NaiveDate) -> Option<usize> {
    if dates.is_empty() {
        return None;
    }

    // First index whose date is >= target
    let after = dates.partition_point(|d| *d < target);
    if after == 0 {
        return Some(0);
    }
    if after == dates.len() {
        return Some(dates.len() - 1);
    }

    let before = after - 1;
    let distance_before = (target - dates[before]).num_days();
    let distance_after = (dates[after] - target).num_days();

    if distance_after < distance_before {
        Some(after)
    } else {
        Some(before)
    }
}

pub fn total_returns(
    prices: &AlignedPrices,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CumulativeReturns, AnalysisError> {
    let start_idx = nearest_date_index(&prices.dates, start).ok_or_else(|| {
        AnalysisError::DateResolution("no trading dates available".to_string())
    })?;
    let end_idx = nearest_date_index(&prices.dates, end).ok_or_else(|| {
        AnalysisError::DateResolution("no trading dates available".to_string())
    })?;

    let resolved_start = prices.dates[start_idx];
    let resolved_end = prices.dates[end_idx];
    if start_idx >= end_idx {
        return Err(AnalysisError::DateResolution(format!(
            "requested {} to {} resolves to {} to {}, an empty window",
            start, end, resolved_start, resolved_end
        )));
    }

    let total_return = prices
        .columns
        .iter()
        .map(|(symbol, column)| {
            let value = (column[end_idx] / column[start_idx] - 1.0) * 100.0;
            (symbol.clone(), value)
        })
        .collect();

    Ok(CumulativeReturns {
        start: resolved_start,
        end: resolved_end,
        total_return,
    })
}
