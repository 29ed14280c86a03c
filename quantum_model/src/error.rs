use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Circuit needs at least one qubit and at most {max}, got {got}")]
    InvalidQubitCount { got: usize, max: usize },

    #[error("Expected {expected} {what}, got {got}")]
    ParameterCount {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Stored model has {stored_qubits} qubits / {stored_reps} reps, configured {qubits} / {reps}")]
    IncompatibleWeights {
        stored_qubits: usize,
        stored_reps: usize,
        qubits: usize,
        reps: usize,
    },

    #[error("Inputs and targets differ in length: {inputs} vs {targets}")]
    LengthMismatch { inputs: usize, targets: usize },

    #[error("Training set is empty")]
    EmptyDataset,

    #[error("Array shape error: {0}")]
    ShapeError(#[from] ndarray::ShapeError),

    #[error("Weights serialization error: {0}")]
    BincodeError(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
