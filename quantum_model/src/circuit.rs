use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub const MAX_QUBITS: usize = 20;

/// Real-amplitude statevector. Qubit `q` is bit `q` of the basis index.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    num_qubits: usize,
    amplitudes: Vec<f64>,
}

impl Statevector {
    /// `|0...0>`
    pub fn zero(num_qubits: usize) -> Self {
        let mut amplitudes = vec![0.0; 1 << num_qubits];
        amplitudes[0] = 1.0;
        Self {
            num_qubits,
            amplitudes,
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let (sin, cos) = (theta / 2.0).sin_cos();
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask != 0 {
                continue;
            }
            let j = i | mask;
            let (a0, a1) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = cos * a0 - sin * a1;
            self.amplitudes[j] = sin * a0 + cos * a1;
        }
    }

    pub fn apply_cx(&mut self, control: usize, target: usize) {
        let control_mask = 1 << control;
        let target_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & control_mask != 0 && i & target_mask == 0 {
                self.amplitudes.swap(i, i | target_mask);
            }
        }
    }

    /// Expectation of `Z ⊗ Z ⊗ ... ⊗ Z`, in `[-1, 1]`.
    pub fn parity_expectation(&self) -> f64 {
        self.amplitudes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let p = a * a;
                if i.count_ones() % 2 == 0 { p } else { -p }
            })
            .sum()
    }

    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a * a).sum()
    }
}

/// `RY` rotation layers interleaved with reverse-linear `CX` entanglement,
/// closed by a final rotation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealAmplitudes {
    num_qubits: usize,
    reps: usize,
}

impl RealAmplitudes {
    pub fn new(num_qubits: usize, reps: usize) -> Result<Self, ModelError> {
        if num_qubits == 0 || num_qubits > MAX_QUBITS {
            return Err(ModelError::InvalidQubitCount {
                got: num_qubits,
                max: MAX_QUBITS,
            });
        }
        Ok(Self { num_qubits, reps })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn reps(&self) -> usize {
        self.reps
    }

    pub fn num_parameters(&self) -> usize {
        self.num_qubits * (self.reps + 1)
    }

    pub fn apply(&self, state: &mut Statevector, params: &[f64]) -> Result<(), ModelError> {
        if params.len() != self.num_parameters() {
            return Err(ModelError::ParameterCount {
                what: "circuit parameters",
                expected: self.num_parameters(),
                got: params.len(),
            });
        }

        let mut layers = params.chunks_exact(self.num_qubits);
        for _ in 0..self.reps {
            if let Some(layer) = layers.next() {
                rotate(state, layer);
            }
            self.entangle(state);
        }
        if let Some(layer) = layers.next() {
            rotate(state, layer);
        }
        Ok(())
    }

    fn entangle(&self, state: &mut Statevector) {
        for control in (0..self.num_qubits.saturating_sub(1)).rev() {
            state.apply_cx(control, control + 1);
        }
    }
}

fn rotate(state: &mut Statevector, layer: &[f64]) {
    for (qubit, theta) in layer.iter().enumerate() {
        state.apply_ry(qubit, *theta);
    }
}
