use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Clone, Deserialize)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// `full` (20+ years of history) or `compact` (latest 100 bars).
    #[serde(default = "default_output_size")]
    pub output_size: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_size() -> String {
    "full".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Legacy key file layout: `{"API_KEY": "..."}`.
#[derive(Deserialize)]
struct ApiKeyFile {
    #[serde(rename = "API_KEY")]
    api_key: Option<String>,
}

impl AlphaVantageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let legacy = std::fs::read_to_string("API_KEY.json")
            .ok()
            .and_then(|raw| serde_json::from_str::<ApiKeyFile>(&raw).ok())
            .and_then(|file| file.api_key);

        let mut builder = Config::builder()
            .add_source(File::new("../alpha_vantage.toml", FileFormat::Toml).required(false))
            .add_source(File::new("alpha_vantage.toml", FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("ALPHA_VANTAGE"));

        if let Some(api_key) = legacy {
            builder = builder.set_default("api_key", api_key)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            output_size: default_output_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
