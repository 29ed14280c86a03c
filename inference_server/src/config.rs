use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_num_qubits")]
    pub num_qubits: usize,
    #[serde(default = "default_reps")]
    pub reps: usize,
    /// Seeds the fallback model used when no weights file exists.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_ticker")]
    pub default_ticker: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> String {
    "../model/quantum_nn_model.bin".to_string()
}

fn default_num_qubits() -> usize {
    4
}

fn default_reps() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cfg = Config::builder()
            .add_source(File::new("../server.toml", FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("QNN_SERVER"))
            .build()?;

        cfg.try_deserialize()
    }
}
