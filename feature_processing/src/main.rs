use std::fs::File;

use anyhow::{Context, Result};
use data_ingestion::config::AlphaVantageConfig;
use data_ingestion::fetcher::StockDataClient;
use data_ingestion::logger::init_logger;
use feature_processing::processor::prepare_features;
use feature_processing::table::write_feature_rows;
use log::info;

/// Fetches one ticker, engineers and scales its features and saves them as
/// `<TICKER>_preprocessed_data.csv` for the training program.
#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());
    info!("Fetching data for {}...", symbol);

    let config = AlphaVantageConfig::from_env().context("loading Alpha Vantage config")?;
    let client = StockDataClient::new(config)?;
    let bars = client.fetch_daily(&symbol, None).await?;

    let prepared = prepare_features(&bars, true)?;
    info!("Data preprocessing complete.");

    let path = format!("{symbol}_preprocessed_data.csv");
    write_feature_rows(File::create(&path)?, &prepared.rows)?;
    info!("Preprocessed data saved to '{}'.", path);

    for row in prepared.rows.iter().take(5) {
        info!("{:?}", row);
    }

    Ok(())
}
