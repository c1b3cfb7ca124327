// src/config.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use validator::{Validate, ValidationError};

pub const DEFAULT_TICKERS: [&str; 6] = [
    "PETR4.SA", "VALE3.SA", "WEGE3.SA", "LREN3.SA", "MGLU3.SA", "B3SA3.SA",
];
pub const DEFAULT_BENCHMARK: &str = "^BVSP";
pub const DEFAULT_START: (i32, u32, u32) = (2024, 1, 1);
pub const DEFAULT_END: (i32, u32, u32) = (2025, 4, 30);
pub const DEFAULT_CHART_DIR: &str = "charts";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_config"))]
pub struct AnalysisConfig {
    #[validate(length(min = 1))]
    pub tickers: Vec<String>,
    #[validate(length(min = 1))]
    pub benchmark: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub chart_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let (sy, sm, sd) = DEFAULT_START;
        let (ey, em, ed) = DEFAULT_END;
        AnalysisConfig {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            benchmark: DEFAULT_BENCHMARK.to_string(),
            start_date: NaiveDate::from_ymd_opt(sy, sm, sd).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(ey, em, ed).unwrap_or_default(),
            chart_dir: PathBuf::from(DEFAULT_CHART_DIR),
        }
    }
}

impl AnalysisConfig {
    // Every symbol the provider has to deliver: assets first, benchmark last
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols = self.tickers.clone();
        symbols.push(self.benchmark.clone());
        symbols
    }
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn validate_config(config: &AnalysisConfig) -> Result<(), ValidationError> {
    if config.start_date >= config.end_date {
        return Err(validation_error(
            "date_window",
            "start_date must be before end_date",
        ));
    }
    if config.tickers.contains(&config.benchmark) {
        return Err(validation_error(
            "benchmark_in_tickers",
            "the benchmark cannot also be an asset",
        ));
    }
    let unique: HashSet<&String> = config.tickers.iter().collect();
    if unique.len() != config.tickers.len() {
        return Err(validation_error("duplicate_ticker", "tickers must be unique"));
    }
    Ok(())
}
