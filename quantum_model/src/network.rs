use std::f64::consts::FRAC_PI_2;

use crate::circuit::{RealAmplitudes, Statevector};
use crate::error::ModelError;

/// Feature map bound to the inputs, ansatz bound to the trainable weights,
/// read out as the parity expectation of the final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoLayerQnn {
    feature_map: RealAmplitudes,
    ansatz: RealAmplitudes,
}

impl TwoLayerQnn {
    pub fn new(num_qubits: usize, reps: usize) -> Result<Self, ModelError> {
        Ok(Self {
            feature_map: RealAmplitudes::new(num_qubits, reps)?,
            ansatz: RealAmplitudes::new(num_qubits, reps)?,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.feature_map.num_qubits()
    }

    pub fn reps(&self) -> usize {
        self.ansatz.reps()
    }

    pub fn num_inputs(&self) -> usize {
        self.feature_map.num_parameters()
    }

    pub fn num_weights(&self) -> usize {
        self.ansatz.num_parameters()
    }

    pub fn forward(&self, input: &[f64], weights: &[f64]) -> Result<f64, ModelError> {
        if input.len() != self.num_inputs() {
            return Err(ModelError::ParameterCount {
                what: "input features",
                expected: self.num_inputs(),
                got: input.len(),
            });
        }

        let mut state = Statevector::zero(self.num_qubits());
        self.feature_map.apply(&mut state, input)?;
        self.ansatz.apply(&mut state, weights)?;
        Ok(state.parity_expectation())
    }

    /// d(forward)/d(weights) by the parameter-shift rule, exact for `RY`.
    pub fn weight_gradient(&self, input: &[f64], weights: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut shifted = weights.to_vec();
        let mut gradient = Vec::with_capacity(weights.len());

        for k in 0..weights.len() {
            shifted[k] = weights[k] + FRAC_PI_2;
            let plus = self.forward(input, &shifted)?;
            shifted[k] = weights[k] - FRAC_PI_2;
            let minus = self.forward(input, &shifted)?;
            shifted[k] = weights[k];

            gradient.push((plus - minus) / 2.0);
        }

        Ok(gradient)
    }
}
