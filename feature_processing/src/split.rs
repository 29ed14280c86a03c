use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::FeatureError;
use crate::misc::{FeatureRow, NUM_FEATURES};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Vec<[f64; NUM_FEATURES]>,
    pub x_test: Vec<[f64; NUM_FEATURES]>,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

/// Shuffles, keeps at most `num_samples` rows, then holds out
/// `ceil(test_size * n)` of them for testing.
pub fn prepare_data(
    rows: &[FeatureRow],
    target: &str,
    test_size: f64,
    num_samples: usize,
    seed: u64,
) -> Result<TrainTestSplit, FeatureError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FeatureError::InvalidSplit(format!(
            "test_size must lie in (0, 1), got {test_size}"
        )));
    }

    let mut samples = rows
        .iter()
        .map(|row| {
            row.value(target)
                .map(|y| (row.values(), y))
                .ok_or_else(|| FeatureError::UnknownColumn(target.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);
    samples.truncate(num_samples);

    let n = samples.len();
    if n < 2 {
        return Err(FeatureError::InvalidSplit(format!(
            "need at least 2 samples, got {n}"
        )));
    }

    samples.shuffle(&mut rng);
    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);
    let (test, train) = samples.split_at(n_test);

    info!("Split {} samples into {} train / {} test", n, train.len(), test.len());
    Ok(TrainTestSplit {
        x_train: train.iter().map(|(x, _)| *x).collect(),
        x_test: test.iter().map(|(x, _)| *x).collect(),
        y_train: train.iter().map(|(_, y)| *y).collect(),
        y_test: test.iter().map(|(_, y)| *y).collect(),
    })
}
