use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AlphaVantageConfig;
use crate::error::DataIngestionError;

const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

/// One trading day of OHLCV data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Inclusive calendar range applied to a fetched series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Deserialize)]
struct DailyEntry {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

pub struct StockDataClient {
    client: Client,
    config: AlphaVantageConfig,
}

impl StockDataClient {
    pub fn new(config: AlphaVantageConfig) -> Result<Self, DataIngestionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetches the daily series for `symbol`, oldest bar first.
    pub async fn fetch_daily(
        &self,
        symbol: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<PriceBar>, DataIngestionError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(DataIngestionError::MissingTicker);
        }

        info!("Fetching daily series for {}", symbol);
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", self.config.output_size.as_str()),
                ("apikey", self.config.api_key.as_str()),
            ])
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;

        let json_resp: Value = response.json().await?;
        let mut bars = parse_daily_series(symbol, &json_resp)?;

        if let Some(range) = range {
            bars.retain(|bar| range.contains(bar.date));
        }

        info!("Data for {} fetched successfully ({} bars)", symbol, bars.len());
        Ok(bars)
    }
}

/// Turns a `TIME_SERIES_DAILY` payload into bars sorted by date.
pub fn parse_daily_series(symbol: &str, json_resp: &Value) -> Result<Vec<PriceBar>, DataIngestionError> {
    let Some(series) = json_resp.get(DAILY_SERIES_KEY) else {
        let message = ["Note", "Information", "Error Message"]
            .iter()
            .find_map(|key| json_resp.get(*key).and_then(Value::as_str))
            .unwrap_or("Unknown error")
            .to_string();
        return Err(DataIngestionError::UpstreamError {
            symbol: symbol.to_string(),
            message,
        });
    };

    let entries: HashMap<String, DailyEntry> = serde_json::from_value(series.clone())?;

    let mut bars = Vec::with_capacity(entries.len());
    for (date, entry) in entries {
        let bar = entry_to_bar(&date, &entry)?;
        if validate_bar(&bar) {
            bars.push(bar);
        } else {
            warn!("Dropping invalid bar for {} on {}", symbol, date);
        }
    }

    bars.sort_by_key(|bar| bar.date);
    debug!("Parsed {} bars for {}", bars.len(), symbol);
    Ok(bars)
}

fn entry_to_bar(date: &str, entry: &DailyEntry) -> Result<PriceBar, DataIngestionError> {
    let malformed = |reason: String| DataIngestionError::MalformedBar {
        date: date.to_string(),
        reason,
    };
    let price = |field: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| malformed(format!("{field} {raw:?}: {e}")))
    };

    Ok(PriceBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| malformed(format!("date: {e}")))?,
        open: price("open", &entry.open)?,
        high: price("high", &entry.high)?,
        low: price("low", &entry.low)?,
        close: price("close", &entry.close)?,
        volume: entry
            .volume
            .trim()
            .parse::<i64>()
            .map_err(|e| malformed(format!("volume {:?}: {e}", entry.volume)))?,
    })
}

pub fn validate_bar(data: &PriceBar) -> bool {
    let mut is_valid = true;
    if data.volume < 0 {
        warn!("Invalid Volume data");
        is_valid = false;
    }

    if data.open < 0.0 {
        warn!("Open cannot be negative");
        is_valid = false;
    }

    if data.close <= 0.0 || !data.close.is_finite() {
        warn!("Close must be positive");
        is_valid = false;
    }

    if data.high < 0.0 {
        warn!("High cannot be negative");
        is_valid = false;
    }

    if data.low < 0.0 {
        warn!("Low cannot be negative");
        is_valid = false;
    }

    is_valid
}
