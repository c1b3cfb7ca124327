// src/pipeline.rs

use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::capm::fit_asset;
use crate::config::AnalysisConfig;
use crate::correlation::{correlation_matrix, cumulative_paths, CorrelationMatrix};
use crate::cumulative::{total_returns, CumulativeReturns};
use crate::loader::PriceSource;
use crate::models::{AnalysisError, CapmFit, PriceTable, RankRow, ReturnTable, RiskAdjusted, Symbol};
use crate::ranking::summarize;
use crate::returns::{align_prices, build_returns};
use crate::risk_adjusted::{best_asset, risk_adjusted_scores};

// Everything one run produces, consumed by the text report and the charts
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub returns: ReturnTable,
    pub cumulative: CumulativeReturns,
    pub risk_adjusted: BTreeMap<Symbol, RiskAdjusted>,
    pub best_asset: Option<Symbol>,
    pub capm: BTreeMap<Symbol, CapmFit>,
    // Assets dropped from the CAPM model and the ranking, with the reason
    pub excluded: Vec<(Symbol, String)>,
    pub ranking: Vec<RankRow>,
    pub correlation: CorrelationMatrix,
    pub cumulative_paths: BTreeMap<Symbol, Vec<f64>>,
}

impl AnalysisReport {
    pub fn benchmark_return(&self) -> Option<f64> {
        self.cumulative
            .total_return
            .get(&self.config.benchmark)
            .copied()
    }
}

// The provider has to answer for every symbol that was asked for
fn check_price_table(table: &PriceTable, symbols: &[Symbol]) -> Result<(), AnalysisError> {
    for symbol in symbols {
        match table.get(symbol) {
            Some(series) if !series.is_empty() => {}
            Some(_) => {
                return Err(AnalysisError::DataFetch {
                    symbol: symbol.clone(),
                    reason: "empty result".to_string(),
                })
            }
            None => {
                return Err(AnalysisError::DataFetch {
                    symbol: symbol.clone(),
                    reason: "missing from provider response".to_string(),
                })
            }
        }
    }
    Ok(())
}

// Model C over every asset. A rejected regression only drops that asset;
// if none survives the last rejection is returned.
pub fn fit_assets(
    returns: &ReturnTable,
    assets: &[Symbol],
    benchmark: &str,
) -> Result<(BTreeMap<Symbol, CapmFit>, Vec<(Symbol, String)>), AnalysisError> {
    let mut fits = BTreeMap::new();
    let mut excluded = Vec::new();
    let mut last_error = None;

    for symbol in assets {
        match fit_asset(returns, symbol, benchmark) {
            Ok(fit) => {
                debug!(
                    symbol = %symbol,
                    alpha = fit.alpha,
                    beta = fit.beta,
                    r_squared = fit.r_squared,
                    "CAPM fit"
                );
                fits.insert(symbol.clone(), fit);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Excluding asset from CAPM model");
                excluded.push((symbol.clone(), e.to_string()));
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if fits.is_empty() => Err(e),
        _ => Ok((fits, excluded)),
    }
}

// Best Sharpe-like score among the assets that made it into the ranking
pub fn pick_best_asset(
    risk_adjusted: &BTreeMap<Symbol, RiskAdjusted>,
    ranked_assets: &[Symbol],
) -> Option<Symbol> {
    let candidates: BTreeMap<Symbol, RiskAdjusted> = risk_adjusted
        .iter()
        .filter(|(symbol, _)| ranked_assets.contains(*symbol))
        .map(|(symbol, score)| (symbol.clone(), score.clone()))
        .collect();
    best_asset(&candidates).cloned()
}

pub async fn run_analysis<S>(source: &S, config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError>
where
    S: PriceSource + ?Sized,
{
    config.validate()?;

    let symbols = config.all_symbols();
    info!(
        symbols = symbols.len(),
        start = %config.start_date,
        end = %config.end_date,
        "Fetching prices"
    );
    let prices = source
        .fetch_prices(&symbols, config.start_date, config.end_date)
        .await?;
    check_price_table(&prices, &symbols)?;

    let aligned = align_prices(&prices)?;
    let returns = build_returns(&aligned)?;
    info!(
        trading_days = aligned.len(),
        return_rows = returns.len(),
        "Built return series"
    );

    // Model A
    let cumulative = total_returns(&aligned, config.start_date, config.end_date)?;
    info!(start = %cumulative.start, end = %cumulative.end, "Computed cumulative returns");

    // Model B
    let risk_adjusted = risk_adjusted_scores(&returns, &config.tickers);
    for (symbol, score) in &risk_adjusted {
        if score.sharpe_like.is_none() {
            warn!(symbol = %symbol, "Sharpe-like score undefined, volatility is zero or unmeasurable");
        }
    }
    info!(scored = risk_adjusted.len(), "Computed risk-adjusted scores");

    // Model C
    let (capm, excluded) = fit_assets(&returns, &config.tickers, &config.benchmark)?;
    info!(fitted = capm.len(), excluded = excluded.len(), "Computed CAPM regressions");

    let ranked_assets: Vec<Symbol> = config
        .tickers
        .iter()
        .filter(|symbol| capm.contains_key(*symbol))
        .cloned()
        .collect();
    let best = pick_best_asset(&risk_adjusted, &ranked_assets);
    info!(best_asset = ?best, "Selected best return/volatility asset");
    let ranking = summarize(&ranked_assets, &cumulative.total_return, &risk_adjusted, &capm)?;
    info!(assets = ranking.len(), "Built composite ranking");

    let correlation = correlation_matrix(&returns, &config.tickers);
    let paths = cumulative_paths(&returns, &config.tickers);

    Ok(AnalysisReport {
        config: config.clone(),
        returns,
        cumulative,
        risk_adjusted,
        best_asset: best,
        capm,
        excluded,
        ranking,
        correlation,
        cumulative_paths: paths,
    })
}
