// src/ranking.rs

use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::models::{AnalysisError, CapmFit, RankRow, RiskAdjusted, Symbol};

// Ranks values from best (1) to worst, higher being better. Tied values share
// the mean of the positions they occupy. Missing values (None or NaN) come
// after every present value and tie among themselves.
pub fn rank_descending(values: &[Option<f64>]) -> Vec<f64> {
    let keys: Vec<Option<NotNan<f64>>> = values
        .iter()
        .map(|v| v.and_then(|x| NotNan::new(x).ok()))
        .collect();

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| Reverse(keys[i]));

    let mut ranks = vec![0.0; keys.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && keys[order[end]] == keys[order[start]] {
            end += 1;
        }
        // Positions start+1 ..= end share their average
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }

    ranks
}

pub fn mean_rank(row: &RankRow) -> f64 {
    (row.return_rank + row.sharpe_rank + row.capm_rank) / 3.0
}

// Orders rows by composite rank, best first; equal composites fall back to
// the symbol so the table is deterministic
pub fn sort_by_mean_rank(rows: &mut [RankRow]) {
    rows.sort_by(|a, b| {
        a.mean_rank
            .total_cmp(&b.mean_rank)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

fn lookup<'a, T>(
    map: &'a BTreeMap<Symbol, T>,
    symbol: &Symbol,
    metric: &'static str,
) -> Result<&'a T, AnalysisError> {
    map.get(symbol).ok_or_else(|| AnalysisError::SchemaMismatch {
        symbol: symbol.clone(),
        metric,
    })
}

// Merges the three models into one table and ranks it. Every asset has to be
// present in every model output.
pub fn summarize(
    assets: &[Symbol],
    total_return: &BTreeMap<Symbol, f64>,
    risk_adjusted: &BTreeMap<Symbol, RiskAdjusted>,
    capm: &BTreeMap<Symbol, CapmFit>,
) -> Result<Vec<RankRow>, AnalysisError> {
    let mut rows = Vec::with_capacity(assets.len());
    for symbol in assets {
        let total = *lookup(total_return, symbol, "total return")?;
        let risk = lookup(risk_adjusted, symbol, "Sharpe-like")?;
        let fit = lookup(capm, symbol, "CAPM score")?;

        rows.push(RankRow {
            symbol: symbol.clone(),
            total_return: total,
            sharpe_like: risk.sharpe_like,
            capm_score: fit.score,
            r_squared: fit.r_squared,
            return_rank: 0.0,
            sharpe_rank: 0.0,
            capm_rank: 0.0,
            mean_rank: 0.0,
        });
    }

    let return_ranks = rank_descending(&rows.iter().map(|r| Some(r.total_return)).collect::<Vec<_>>());
    let sharpe_ranks = rank_descending(&rows.iter().map(|r| r.sharpe_like).collect::<Vec<_>>());
    let capm_ranks = rank_descending(&rows.iter().map(|r| Some(r.capm_score)).collect::<Vec<_>>());

    for (i, row) in rows.iter_mut().enumerate() {
        row.return_rank = return_ranks[i];
        row.sharpe_rank = sharpe_ranks[i];
        row.capm_rank = capm_ranks[i];
        row.mean_rank = mean_rank(row);
    }

    sort_by_mean_rank(&mut rows);
    Ok(rows)
}
