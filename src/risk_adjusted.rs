// src/risk_adjusted.rs

use chrono::Datelike;
use ordered_float::NotNan;
use std::collections::BTreeMap;

use crate::models::{ReturnTable, RiskAdjusted, Symbol};
use crate::utils::{mean, sample_std};

const MONTHS_PER_YEAR: f64 = 12.0;
// Volatility at or below this fraction of the annual return is rounding noise
// from constant returns and counts as zero
const NEGLIGIBLE_VOLATILITY: f64 = 1e-12;

// Monthly mean and volatility of one return column, keyed by (year, month).
// The std is None for months with fewer than two observations.
pub fn monthly_buckets(
    returns: &ReturnTable,
    symbol: &str,
) -> BTreeMap<(i32, u32), (f64, Option<f64>)> {
    let mut grouped: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();

    if let Some(column) = returns.column(symbol) {
        for (date, value) in returns.dates.iter().zip(column.iter()) {
            grouped
                .entry((date.year(), date.month()))
                .or_default()
                .push(*value);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(month, values)| {
            let month_mean = mean(&values)?;
            Some((month, (month_mean, sample_std(&values))))
        })
        .collect()
}

pub fn risk_adjusted_score(returns: &ReturnTable, symbol: &str) -> Option<RiskAdjusted> {
    let buckets = monthly_buckets(returns, symbol);

    let monthly_means: Vec<f64> = buckets.values().map(|(m, _)| *m).collect();
    let monthly_stds: Vec<f64> = buckets.values().filter_map(|(_, s)| *s).collect();

    let annual_return = mean(&monthly_means)? * MONTHS_PER_YEAR * 100.0;
    let annual_volatility = mean(&monthly_stds)
        .map(|s| s * MONTHS_PER_YEAR.sqrt() * 100.0)
        .map(|vol| {
            if vol <= NEGLIGIBLE_VOLATILITY * annual_return.abs() {
                0.0
            } else {
                vol
            }
        });

    let sharpe_like = match annual_volatility {
        Some(vol) if vol != 0.0 => Some(annual_return / vol),
        _ => None,
    };

    Some(RiskAdjusted {
        annual_return,
        annual_volatility,
        sharpe_like,
    })
}

pub fn risk_adjusted_scores<'a, I>(returns: &ReturnTable, symbols: I) -> BTreeMap<Symbol, RiskAdjusted>
where
    I: IntoIterator<Item = &'a Symbol>,
{
    symbols
        .into_iter()
        .filter_map(|symbol| {
            risk_adjusted_score(returns, symbol).map(|score| (symbol.clone(), score))
        })
        .collect()
}

// Asset with the highest defined Sharpe-like score. Undefined scores never
// win; on equal scores the alphabetically first symbol is kept.
pub fn best_asset(scores: &BTreeMap<Symbol, RiskAdjusted>) -> Option<&Symbol> {
    let mut best: Option<(&Symbol, NotNan<f64>)> = None;

    for (symbol, score) in scores {
        let Some(value) = score.sharpe_like.and_then(|v| NotNan::new(v).ok()) else {
            continue;
        };
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((symbol, value)),
        }
    }

    best.map(|(symbol, _)| symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn returns(dates: Vec<NaiveDate>, columns: Vec<(&str, Vec<f64>)>) -> ReturnTable {
        ReturnTable {
            dates,
            columns: columns
                .into_iter()
                .map(|(symbol, values)| (symbol.to_string(), values))
                .collect(),
        }
    }

    fn score(sharpe_like: Option<f64>) -> RiskAdjusted {
        RiskAdjusted {
            annual_return: 0.0,
            annual_volatility: None,
            sharpe_like,
        }
    }

    #[test]
    fn test_annualized_values() {
        // Two months with two observations each
        let table = returns(
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 2, 1), date(2024, 2, 2)],
            vec![("A", vec![0.01, 0.03, 0.00, 0.02])],
        );

        let result = risk_adjusted_score(&table, "A").unwrap();

        // Monthly means 0.02 and 0.01; monthly stds both sqrt(0.0002)
        let expected_return = 0.015 * 12.0 * 100.0;
        let expected_vol = 0.0002_f64.sqrt() * 12.0_f64.sqrt() * 100.0;
        assert!((result.annual_return - expected_return).abs() < 1e-9);
        assert!((result.annual_volatility.unwrap() - expected_vol).abs() < 1e-9);
        assert!((result.sharpe_like.unwrap() - expected_return / expected_vol).abs() < 1e-9);
    }

    #[test]
    fn test_single_observation_month_is_excluded_from_volatility() {
        let table = returns(
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 2, 1)],
            vec![("A", vec![0.01, 0.03, 0.50])],
        );

        let buckets = monthly_buckets(&table, "A");
        assert_eq!(buckets[&(2024, 2)].1, None);

        let result = risk_adjusted_score(&table, "A").unwrap();
        // Volatility comes from January alone, the return from both months
        let expected_vol = 0.0002_f64.sqrt() * 12.0_f64.sqrt() * 100.0;
        assert!((result.annual_volatility.unwrap() - expected_vol).abs() < 1e-9);
        let expected_return = (0.02 + 0.50) / 2.0 * 12.0 * 100.0;
        assert!((result.annual_return - expected_return).abs() < 1e-9);
    }

    #[test]
    fn test_zero_volatility_is_undefined() {
        let table = returns(
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)],
            vec![("FLAT", vec![0.0, 0.0, 0.0]), ("STEADY", vec![0.5, 0.5, 0.5])],
        );

        let flat = risk_adjusted_score(&table, "FLAT").unwrap();
        assert_eq!(flat.annual_volatility, Some(0.0));
        assert_eq!(flat.sharpe_like, None);

        let steady = risk_adjusted_score(&table, "STEADY").unwrap();
        assert_eq!(steady.sharpe_like, None);
        assert!(steady.annual_return.is_finite());
    }

    #[test]
    fn test_constant_inexact_return_is_undefined() {
        // 0.1 is not exactly representable, so the raw std is a few ulps, not zero
        let table = returns(
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)],
            vec![
                ("CONST", vec![0.1, 0.1, 0.1]),
                ("MOVING", vec![0.01, 0.03, 0.02]),
            ],
        );

        let constant = risk_adjusted_score(&table, "CONST").unwrap();
        assert_eq!(constant.annual_volatility, Some(0.0));
        assert_eq!(constant.sharpe_like, None);
        assert!((constant.annual_return - 120.0).abs() < 1e-9);

        let scores = risk_adjusted_scores(&table, &["CONST".to_string(), "MOVING".to_string()]);
        assert_eq!(best_asset(&scores), Some(&"MOVING".to_string()));
    }

    #[test]
    fn test_no_measurable_month_is_undefined() {
        let table = returns(
            vec![date(2024, 1, 31), date(2024, 2, 1)],
            vec![("A", vec![0.01, 0.02])],
        );

        let result = risk_adjusted_score(&table, "A").unwrap();
        assert_eq!(result.annual_volatility, None);
        assert_eq!(result.sharpe_like, None);
    }

    #[test]
    fn test_unknown_symbol_has_no_score() {
        let table = returns(vec![date(2024, 1, 2)], vec![("A", vec![0.01])]);
        assert_eq!(risk_adjusted_score(&table, "B"), None);
    }

    #[test]
    fn test_best_asset_skips_undefined() {
        let scores = BTreeMap::from([
            ("A".to_string(), score(Some(0.4))),
            ("B".to_string(), score(None)),
            ("C".to_string(), score(Some(1.2))),
            ("D".to_string(), score(Some(1.2))),
        ]);

        assert_eq!(best_asset(&scores), Some(&"C".to_string()));
    }

    #[test]
    fn test_best_asset_none_when_all_undefined() {
        let scores = BTreeMap::from([("A".to_string(), score(None))]);
        assert_eq!(best_asset(&scores), None);
    }
}
