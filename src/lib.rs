// src/lib.rs

pub mod capm;
pub mod charts;
pub mod config;
pub mod correlation;
pub mod cumulative;
pub mod loader;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod returns;
pub mod risk_adjusted;
pub mod utils;

use crate::config::AnalysisConfig;
use crate::loader::YahooClient;
use crate::models::AnalysisError;

// Runs the default analysis against Yahoo Finance, prints the report and
// writes the charts
pub async fn run_report(config: &AnalysisConfig) -> Result<(), AnalysisError> {
    let client = YahooClient::new()?;
    let report = pipeline::run_analysis(&client, config).await?;

    print!("{}", report::render(&report));
    charts::write_charts(&report, &config.chart_dir)?;
    Ok(())
}
