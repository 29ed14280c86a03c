use std::fs::File;

use anyhow::{Context, Result};
use data_ingestion::config::AlphaVantageConfig;
use data_ingestion::fetcher::StockDataClient;
use data_ingestion::logger::init_logger;
use log::info;

/// Dumps the raw daily series of one ticker to `<TICKER>_daily.csv`.
#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());
    let config = AlphaVantageConfig::from_env().context("loading Alpha Vantage config")?;
    let client = StockDataClient::new(config)?;

    let bars = client.fetch_daily(&symbol, None).await?;

    let path = format!("{symbol}_daily.csv");
    let mut writer = csv::Writer::from_writer(File::create(&path)?);
    for bar in &bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;

    info!("Wrote {} bars to '{}'", bars.len(), path);
    Ok(())
}
