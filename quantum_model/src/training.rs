use std::time::{Duration, Instant};

use log::info;
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::ModelError;
use crate::model::{HybridModel, SampleGradient};
use crate::optimizer::Adam;

#[derive(Debug, Clone, Copy)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Full-batch MSE before each epoch's update.
    pub losses: Vec<f64>,
    pub elapsed: Duration,
}

/// Full-batch Adam on mean squared error.
pub fn train(
    model: &mut HybridModel,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    config: TrainingConfig,
) -> Result<TrainingReport, ModelError> {
    check_dataset(model, x, y)?;

    let mut optimizer = Adam::new(config.learning_rate, model.num_parameters());
    let mut losses = Vec::with_capacity(config.epochs);
    let start = Instant::now();

    for epoch in 0..config.epochs {
        let (loss, gradient) = loss_and_gradient(model, x, y)?;

        let mut params = model.parameters();
        optimizer.step(&mut params, &gradient);
        model.set_parameters(&params)?;

        info!("Epoch {}/{}, Loss: {}", epoch + 1, config.epochs, loss);
        losses.push(loss);
    }

    let elapsed = start.elapsed();
    info!("Training completed in {:.2} seconds", elapsed.as_secs_f64());
    Ok(TrainingReport { losses, elapsed })
}

/// Mean squared error of the model on `(x, y)`.
pub fn evaluate(model: &HybridModel, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<f64, ModelError> {
    check_dataset(model, x, y)?;
    let predictions = model.predict(x)?;
    Ok(mse(predictions.view(), y))
}

pub fn mse(predictions: ArrayView1<f64>, targets: ArrayView1<f64>) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / predictions.len() as f64
}

fn check_dataset(model: &HybridModel, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyDataset);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            inputs: x.nrows(),
            targets: y.len(),
        });
    }
    model.check_width(x.ncols())
}

fn loss_and_gradient(
    model: &HybridModel,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> Result<(f64, Vec<f64>), ModelError> {
    let samples = (0..x.nrows())
        .into_par_iter()
        .map(|i| model.sample_gradient(&x.row(i).to_vec(), y[i]))
        .collect::<Result<Vec<SampleGradient>, ModelError>>()?;

    let n = samples.len() as f64;
    let mut gradient = vec![0.0; model.num_parameters()];
    let mut loss = 0.0;
    let bias_idx = gradient.len() - 1;
    let weight_idx = gradient.len() - 2;

    for sample in &samples {
        loss += sample.squared_error;
        for (g, s) in gradient.iter_mut().zip(&sample.ansatz) {
            *g += s;
        }
        gradient[weight_idx] += sample.linear_weight;
        gradient[bias_idx] += sample.linear_bias;
    }

    gradient.iter_mut().for_each(|g| *g /= n);
    Ok((loss / n, gradient))
}
