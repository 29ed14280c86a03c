use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataIngestionError {
    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Config not found: {0}")]
    ConfigValueNotFoundError(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ticker symbol is required.")]
    MissingTicker,

    #[error("Error fetching data for {symbol}: {message}")]
    UpstreamError { symbol: String, message: String },

    #[error("Malformed bar for {date}: {reason}")]
    MalformedBar { date: String, reason: String },
}
