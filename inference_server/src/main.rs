mod chart;
mod config;
mod engine;
mod error;
mod misc;
mod server;

use anyhow::{Context, Result};
use data_ingestion::config::AlphaVantageConfig;
use data_ingestion::fetcher::StockDataClient;
use data_ingestion::logger::init_logger;
use log::{info, warn};

use crate::config::ServerConfig;
use crate::engine::InferenceEngine;
use crate::server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let config = ServerConfig::from_env().context("loading server config")?;
    info!("🚀Loading QNN model...");
    let engine = InferenceEngine::load(&config).context("loading model weights")?;

    // Prediction from uploads works without a provider key.
    let market_config = AlphaVantageConfig::from_env().unwrap_or_else(|e| {
        warn!("Alpha Vantage config unavailable ({}); stock fetches will fail", e);
        AlphaVantageConfig::with_api_key("")
    });
    let market_data = StockDataClient::new(market_config)?;

    let server = Server::init(&config, engine, market_data);
    server.run().await?;

    info!("Server has been shut down gracefully");
    Ok(())
}
