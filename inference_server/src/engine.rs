use std::path::Path;

use feature_processing::misc::{FeatureRow, NUM_FEATURES};
use log::{info, warn};
use ndarray::Array2;
use quantum_model::error::ModelError;
use quantum_model::model::HybridModel;

use crate::config::ServerConfig;

/// The trained model, loaded once and shared read-only by all requests.
pub struct InferenceEngine {
    model: HybridModel,
    model_loaded: bool,
}

impl InferenceEngine {
    /// A missing weights file is tolerated: the engine falls back to a
    /// freshly initialized model. Unreadable or mismatched weights are not.
    pub fn load(config: &ServerConfig) -> Result<Self, ModelError> {
        let path = Path::new(&config.model_path);
        if !path.exists() {
            warn!(
                "Model file not found at {}. Ensure the model is trained and saved.",
                path.display()
            );
            let model = HybridModel::new(config.num_qubits, config.reps, config.seed)?;
            model.expect_features(NUM_FEATURES)?;
            return Ok(Self::new(model, false));
        }

        let model = HybridModel::load(path, config.num_qubits, config.reps)?;
        model.expect_features(NUM_FEATURES)?;
        info!("Model loaded successfully from {}", path.display());
        Ok(Self::new(model, true))
    }

    pub fn new(model: HybridModel, model_loaded: bool) -> Self {
        Self {
            model,
            model_loaded,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        let input_data: Vec<f64> = rows.iter().flat_map(|row| row.values()).collect();
        let input_array = Array2::from_shape_vec((rows.len(), NUM_FEATURES), input_data)?;

        Ok(self.model.predict(input_array.view())?.to_vec())
    }
}
