// src/main.rs

use equity_ranker::config::AnalysisConfig;
use equity_ranker::logging::init_logging;
use equity_ranker::run_report;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = AnalysisConfig::default();
    info!(
        tickers = ?config.tickers,
        benchmark = %config.benchmark,
        "Starting equity ranking"
    );

    match run_report(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Analysis failed");
            ExitCode::FAILURE
        }
    }
}
