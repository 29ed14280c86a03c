use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::training::TrainingConfig;

/// Settings of the `train_qnn` program.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainSettings {
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_loss_path")]
    pub loss_path: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    #[serde(default = "default_num_qubits")]
    pub num_qubits: usize,
    #[serde(default = "default_reps")]
    pub reps: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_data_path() -> String {
    "../data/AAPL_preprocessed_data.csv".to_string()
}

fn default_model_path() -> String {
    "../model/quantum_nn_model.bin".to_string()
}

fn default_loss_path() -> String {
    "../model/training_loss.csv".to_string()
}

fn default_target() -> String {
    "close".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_num_samples() -> usize {
    100
}

fn default_num_qubits() -> usize {
    4
}

fn default_reps() -> usize {
    1
}

fn default_epochs() -> usize {
    10
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    42
}

impl TrainSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let cfg = Config::builder()
            .add_source(File::new("../train.toml", FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("QNN_TRAIN"))
            .build()?;

        cfg.try_deserialize()
    }

    pub fn training(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.epochs,
            learning_rate: self.learning_rate,
        }
    }
}
