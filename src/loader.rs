// src/loader.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::models::{AnalysisError, PriceSeries, PriceTable, Symbol};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Anything that can deliver adjusted closing prices for a date range
#[async_trait]
pub trait PriceSource {
    async fn fetch_prices(
        &self,
        symbols: &[Symbol],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, AnalysisError>;
}

// Define the Yahoo chart API structure
#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    pub currency: Option<String>,
    // Exchange offset from UTC in seconds, e.g. -10800 for B3
    #[serde(rename = "gmtoffset", default)]
    pub gmt_offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
    #[serde(default)]
    pub adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjCloseColumn {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

// Turns a chart API payload into a price series. Adjusted closes are
// preferred; rows without any close are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries, AnalysisError> {
    let fetch_error = |reason: String| AnalysisError::DataFetch {
        symbol: symbol.to_string(),
        reason,
    };

    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| fetch_error(format!("malformed response: {}", e)))?;

    if let Some(err) = response.chart.error {
        return Err(fetch_error(format!("API error [{}]: {}", err.code, err.description)));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| fetch_error("empty result".to_string()))?;

    let adjusted = result.indicators.adjclose.first().map(|c| &c.adjclose);
    let closes = result.indicators.quote.first().map(|q| &q.close);

    let mut points = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let price = adjusted
            .and_then(|col| col.get(i).copied().flatten())
            .or_else(|| closes.and_then(|col| col.get(i).copied().flatten()));
        let Some(price) = price else {
            continue;
        };
        // Shift to exchange local time before taking the trading date
        let Some(moment) = DateTime::from_timestamp(ts + result.meta.gmt_offset, 0) else {
            continue;
        };
        points.push((moment.date_naive(), price));
    }

    let series = PriceSeries::new(symbol, points);
    if series.is_empty() {
        return Err(fetch_error("empty result".to_string()));
    }

    debug!(
        symbol = %symbol,
        currency = ?result.meta.currency,
        points = series.len(),
        "Parsed chart response"
    );
    Ok(series)
}

#[derive(Debug, Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    retry_delay: Duration,
}

impl YahooClient {
    pub fn new() -> Result<Self, AnalysisError> {
        Self::with_base_url(YAHOO_CHART_URL)
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AnalysisError::DataFetch {
                symbol: "*".to_string(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(YahooClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    // The window is [start, end): the end date's own session is not requested
    fn period_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
        let to_epoch = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default()
        };
        (to_epoch(start), to_epoch(end))
    }

    async fn try_fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<String, AnalysisError> {
        let (period1, period2) = Self::period_bounds(start, end);
        let url = format!("{}/{}", self.base_url, symbol);

        let fetch_error = |e: reqwest::Error| AnalysisError::DataFetch {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,splits".to_string()),
            ])
            .send()
            .await
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?;

        response.text().await.map_err(fetch_error)
    }

    // Bounded retry with linear backoff around a single symbol request
    pub async fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, AnalysisError> {
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_fetch(symbol, start, end).await {
                Ok(body) => return parse_chart(symbol, &body),
                Err(e) => {
                    if attempt < MAX_ATTEMPTS {
                        let delay = self.retry_delay * attempt;
                        warn!(
                            symbol = %symbol,
                            attempt = attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Price request failed, retrying after delay"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| AnalysisError::DataFetch {
            symbol: symbol.to_string(),
            reason: "no attempt made".to_string(),
        });
        error!(symbol = %symbol, attempts = MAX_ATTEMPTS, error = %err, "Giving up on price request");
        Err(err)
    }
}

#[async_trait]
impl PriceSource for YahooClient {
    async fn fetch_prices(
        &self,
        symbols: &[Symbol],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, AnalysisError> {
        let mut table = PriceTable::new();
        for symbol in symbols {
            let series = self.fetch_symbol(symbol, start, end).await?;
            info!(symbol = %symbol, points = series.len(), "Fetched prices");
            table.insert(symbol.clone(), series);
        }
        Ok(table)
    }
}

// Prices held in memory, clipped to [start, end) on fetch
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    table: PriceTable,
}

impl InMemorySource {
    pub fn new(table: PriceTable) -> Self {
        InMemorySource { table }
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.table.insert(series.symbol.clone(), series);
    }
}

#[async_trait]
impl PriceSource for InMemorySource {
    async fn fetch_prices(
        &self,
        symbols: &[Symbol],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, AnalysisError> {
        let mut table = PriceTable::new();
        for symbol in symbols {
            let stored = self.table.get(symbol).ok_or_else(|| AnalysisError::DataFetch {
                symbol: symbol.clone(),
                reason: "unknown symbol".to_string(),
            })?;

            let clipped = PriceSeries::new(
                symbol.clone(),
                stored
                    .iter()
                    .filter(|(date, _)| **date >= start && **date < end)
                    .map(|(date, price)| (*date, *price)),
            );
            if clipped.is_empty() {
                return Err(AnalysisError::DataFetch {
                    symbol: symbol.clone(),
                    reason: "empty result".to_string(),
                });
            }
            table.insert(symbol.clone(), clipped);
        }
        Ok(table)
    }
}
