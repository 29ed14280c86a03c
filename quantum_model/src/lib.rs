//! Hybrid quantum/classical regression: a two-layer variational circuit
//! evaluated on an exact statevector, followed by a `Linear(1, 1)` head.

pub mod circuit;
pub mod config;
pub mod error;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod training;
