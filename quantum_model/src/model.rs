use std::fs;
use std::path::Path;

use log::info;
use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::network::TwoLayerQnn;

/// Everything needed to rebuild a trained [`HybridModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub num_qubits: usize,
    pub reps: usize,
    pub ansatz: Vec<f64>,
    pub linear_weight: f64,
    pub linear_bias: f64,
}

impl ModelWeights {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bincode::serialize(self)?)?;
        info!("Model saved as {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// `y = w * qnn(x; theta) + b`
#[derive(Debug, Clone)]
pub struct HybridModel {
    qnn: TwoLayerQnn,
    ansatz: Vec<f64>,
    linear_weight: f64,
    linear_bias: f64,
}

/// Per-sample contribution to the MSE loss and its gradient.
pub(crate) struct SampleGradient {
    pub squared_error: f64,
    pub ansatz: Vec<f64>,
    pub linear_weight: f64,
    pub linear_bias: f64,
}

impl HybridModel {
    /// Fresh model with every parameter drawn from `U(-1, 1)`.
    pub fn new(num_qubits: usize, reps: usize, seed: u64) -> Result<Self, ModelError> {
        let qnn = TwoLayerQnn::new(num_qubits, reps)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let ansatz = (0..qnn.num_weights())
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();

        Ok(Self {
            qnn,
            ansatz,
            linear_weight: rng.random_range(-1.0..1.0),
            linear_bias: rng.random_range(-1.0..1.0),
        })
    }

    pub fn from_weights(weights: ModelWeights) -> Result<Self, ModelError> {
        let qnn = TwoLayerQnn::new(weights.num_qubits, weights.reps)?;
        if weights.ansatz.len() != qnn.num_weights() {
            return Err(ModelError::ParameterCount {
                what: "ansatz weights",
                expected: qnn.num_weights(),
                got: weights.ansatz.len(),
            });
        }

        Ok(Self {
            qnn,
            ansatz: weights.ansatz,
            linear_weight: weights.linear_weight,
            linear_bias: weights.linear_bias,
        })
    }

    /// Loads stored weights and checks they fit the configured circuit.
    pub fn load(path: impl AsRef<Path>, num_qubits: usize, reps: usize) -> Result<Self, ModelError> {
        let weights = ModelWeights::load(path)?;
        if weights.num_qubits != num_qubits || weights.reps != reps {
            return Err(ModelError::IncompatibleWeights {
                stored_qubits: weights.num_qubits,
                stored_reps: weights.reps,
                qubits: num_qubits,
                reps,
            });
        }
        Self::from_weights(weights)
    }

    pub fn weights(&self) -> ModelWeights {
        ModelWeights {
            num_qubits: self.qnn.num_qubits(),
            reps: self.qnn.reps(),
            ansatz: self.ansatz.clone(),
            linear_weight: self.linear_weight,
            linear_bias: self.linear_bias,
        }
    }

    pub fn num_features(&self) -> usize {
        self.qnn.num_inputs()
    }

    /// Fails unless the feature map binds exactly `count` input features.
    pub fn expect_features(&self, count: usize) -> Result<(), ModelError> {
        if self.num_features() != count {
            return Err(ModelError::ParameterCount {
                what: "model input features",
                expected: count,
                got: self.num_features(),
            });
        }
        Ok(())
    }

    pub fn num_parameters(&self) -> usize {
        self.ansatz.len() + 2
    }

    /// Ansatz weights followed by the linear weight and bias.
    pub fn parameters(&self) -> Vec<f64> {
        let mut params = self.ansatz.clone();
        params.push(self.linear_weight);
        params.push(self.linear_bias);
        params
    }

    pub fn set_parameters(&mut self, params: &[f64]) -> Result<(), ModelError> {
        if params.len() != self.num_parameters() {
            return Err(ModelError::ParameterCount {
                what: "model parameters",
                expected: self.num_parameters(),
                got: params.len(),
            });
        }
        let n = self.ansatz.len();
        self.ansatz.copy_from_slice(&params[..n]);
        self.linear_weight = params[n];
        self.linear_bias = params[n + 1];
        Ok(())
    }

    pub fn forward_row(&self, features: &[f64]) -> Result<f64, ModelError> {
        let q = self.qnn.forward(features, &self.ansatz)?;
        Ok(self.linear_weight * q + self.linear_bias)
    }

    /// One prediction per row of `x`.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.check_width(x.ncols())?;

        let predictions = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.forward_row(&x.row(i).to_vec()))
            .collect::<Result<Vec<f64>, ModelError>>()?;

        Ok(Array1::from(predictions))
    }

    pub(crate) fn sample_gradient(&self, features: &[f64], target: f64) -> Result<SampleGradient, ModelError> {
        let q = self.qnn.forward(features, &self.ansatz)?;
        let dq = self.qnn.weight_gradient(features, &self.ansatz)?;

        let residual = self.linear_weight * q + self.linear_bias - target;
        let scale = 2.0 * residual;

        Ok(SampleGradient {
            squared_error: residual * residual,
            ansatz: dq.iter().map(|g| scale * self.linear_weight * g).collect(),
            linear_weight: scale * q,
            linear_bias: scale,
        })
    }

    pub(crate) fn check_width(&self, ncols: usize) -> Result<(), ModelError> {
        if ncols != self.num_features() {
            return Err(ModelError::ParameterCount {
                what: "input features",
                expected: self.num_features(),
                got: ncols,
            });
        }
        Ok(())
    }
}
