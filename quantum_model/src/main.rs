use std::fs::File;

use anyhow::{Context, Result};
use data_ingestion::logger::init_logger;
use feature_processing::misc::NUM_FEATURES;
use feature_processing::split::prepare_data;
use feature_processing::table::read_feature_rows;
use log::info;
use ndarray::{Array1, Array2};
use quantum_model::config::TrainSettings;
use quantum_model::model::HybridModel;
use quantum_model::training::{evaluate, train};

fn to_matrix(rows: &[[f64; NUM_FEATURES]]) -> Result<Array2<f64>> {
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), NUM_FEATURES), flat)?)
}

fn main() -> Result<()> {
    init_logger();
    let settings = TrainSettings::from_env().context("loading training settings")?;

    let file = File::open(&settings.data_path)
        .with_context(|| format!("opening {}", settings.data_path))?;
    let rows = read_feature_rows(file)?;
    info!("Loaded {} feature rows from {}", rows.len(), settings.data_path);

    let split = prepare_data(
        &rows,
        &settings.target,
        settings.test_size,
        settings.num_samples,
        settings.seed,
    )?;
    let x_train = to_matrix(&split.x_train)?;
    let x_test = to_matrix(&split.x_test)?;
    let y_train = Array1::from(split.y_train);
    let y_test = Array1::from(split.y_test);

    let mut model = HybridModel::new(settings.num_qubits, settings.reps, settings.seed)?;
    model
        .expect_features(NUM_FEATURES)
        .context("num_qubits and reps must give one circuit input per feature column")?;
    let report = train(&mut model, x_train.view(), y_train.view(), settings.training())?;

    let test_loss = evaluate(&model, x_test.view(), y_test.view())?;
    info!("Test MSE: {}", test_loss);

    model.weights().save(&settings.model_path)?;

    let mut writer = csv::Writer::from_path(&settings.loss_path)?;
    writer.write_record(["epoch", "loss"])?;
    for (epoch, loss) in report.losses.iter().enumerate() {
        writer.write_record([(epoch + 1).to_string(), loss.to_string()])?;
    }
    writer.flush()?;
    info!("Training loss written to {}", settings.loss_path);

    Ok(())
}
