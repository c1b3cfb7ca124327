// src/capm.rs

use crate::models::{AnalysisError, CapmFit, ReturnTable};
use crate::utils::{mean, sample_covariance};

// OLS of asset returns on benchmark returns with an intercept:
// asset = alpha + beta * benchmark + e
pub fn regress(asset: &[f64], benchmark: &[f64], symbol: &str) -> Result<CapmFit, AnalysisError> {
    if asset.len() != benchmark.len() {
        return Err(AnalysisError::RegressionInput {
            symbol: symbol.to_string(),
            reason: format!(
                "{} asset returns vs {} benchmark returns",
                asset.len(),
                benchmark.len()
            ),
        });
    }
    if asset.len() < 2 {
        return Err(AnalysisError::RegressionInput {
            symbol: symbol.to_string(),
            reason: format!("{} paired observations, need at least 2", asset.len()),
        });
    }

    let (Some(var_b), Some(cov_ab), Some(mean_a), Some(mean_b)) = (
        sample_covariance(benchmark, benchmark),
        sample_covariance(asset, benchmark),
        mean(asset),
        mean(benchmark),
    ) else {
        return Err(AnalysisError::RegressionInput {
            symbol: symbol.to_string(),
            reason: "regression moments undefined".to_string(),
        });
    };

    if var_b == 0.0 {
        return Err(AnalysisError::RegressionInput {
            symbol: symbol.to_string(),
            reason: "benchmark returns have zero variance".to_string(),
        });
    }

    let beta = cov_ab / var_b;
    let alpha = mean_a - beta * mean_b;

    let ss_res: f64 = asset
        .iter()
        .zip(benchmark.iter())
        .map(|(a, b)| {
            let residual = a - alpha - beta * b;
            residual * residual
        })
        .sum();
    let ss_tot: f64 = asset.iter().map(|a| (a - mean_a) * (a - mean_a)).sum();

    // Constant asset returns leave nothing for the benchmark to explain
    let r_squared = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };

    Ok(CapmFit {
        alpha,
        beta,
        r_squared,
        score: capm_score(alpha, beta),
    })
}

// Zero-beta assets are neutral, not undefined
pub fn capm_score(alpha: f64, beta: f64) -> f64 {
    if beta != 0.0 {
        alpha / beta
    } else {
        0.0
    }
}

pub fn fit_asset(returns: &ReturnTable, symbol: &str, benchmark: &str) -> Result<CapmFit, AnalysisError> {
    let asset = returns.column(symbol).ok_or_else(|| AnalysisError::RegressionInput {
        symbol: symbol.to_string(),
        reason: "no aligned returns".to_string(),
    })?;
    let market = returns.column(benchmark).ok_or_else(|| AnalysisError::RegressionInput {
        symbol: symbol.to_string(),
        reason: format!("no aligned returns for benchmark {}", benchmark),
    })?;

    regress(asset, market, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_to_benchmark() {
        let benchmark = vec![0.01, -0.01, 0.02, -0.02];
        let asset = benchmark.clone();

        let fit = regress(&asset, &benchmark, "A").unwrap();

        assert_eq!(fit.alpha, 0.0);
        assert_eq!(fit.beta, 1.0);
        assert_eq!(fit.r_squared, 1.0);
        // Alpha is exactly zero, so the score is zero even with a non-zero beta
        assert_eq!(fit.score, 0.0);
    }

    #[test]
    fn test_scaled_benchmark() {
        let benchmark = vec![0.012, -0.007, 0.021, -0.015, 0.004, 0.009];
        for c in [0.5, 1.7, -2.3] {
            let asset: Vec<f64> = benchmark.iter().map(|b| c * b).collect();
            let fit = regress(&asset, &benchmark, "A").unwrap();

            assert!(fit.alpha.abs() < 1e-9);
            assert!((fit.beta - c).abs() < 1e-9);
            assert!((fit.r_squared - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_intercept_is_recovered() {
        let benchmark = vec![0.01, -0.02, 0.03, 0.00, -0.01];
        let asset: Vec<f64> = benchmark.iter().map(|b| 0.001 + 1.5 * b).collect();

        let fit = regress(&asset, &benchmark, "A").unwrap();
        assert!((fit.alpha - 0.001).abs() < 1e-9);
        assert!((fit.beta - 1.5).abs() < 1e-9);
        assert!((fit.score - 0.001 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_beta_scores_zero() {
        let benchmark = vec![0.125, -0.125, 0.125, -0.125];
        let asset = vec![0.25, 0.25, 0.25, 0.25];

        let fit = regress(&asset, &benchmark, "A").unwrap();
        assert_eq!(fit.beta, 0.0);
        assert_eq!(fit.alpha, 0.25);
        assert_eq!(fit.score, 0.0);
        assert_eq!(fit.r_squared, 0.0);
    }

    #[test]
    fn test_capm_score_fallback() {
        assert_eq!(capm_score(0.7, 0.0), 0.0);
        assert_eq!(capm_score(-0.7, 0.0), 0.0);
        assert!((capm_score(0.3, 1.5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_flat_benchmark_is_rejected() {
        let benchmark = vec![0.25, 0.25, 0.25];
        let asset = vec![0.02, -0.01, 0.03];

        match regress(&asset, &benchmark, "LREN3.SA") {
            Err(AnalysisError::RegressionInput { symbol, reason }) => {
                assert_eq!(symbol, "LREN3.SA");
                assert!(reason.contains("zero variance"));
            }
            other => panic!("Expected RegressionInput error, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_pairs_is_rejected() {
        let result = regress(&[0.01], &[0.02], "A");
        assert!(matches!(result, Err(AnalysisError::RegressionInput { .. })));
    }

    #[test]
    fn test_fit_asset_missing_column() {
        let returns = ReturnTable {
            dates: vec![],
            columns: Default::default(),
        };
        assert!(matches!(
            fit_asset(&returns, "A", "^BVSP"),
            Err(AnalysisError::RegressionInput { .. })
        ));
    }
}
