use feature_processing::misc::FeatureRow;
use serde::Serialize;

/// A feature row with the model's output appended.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    #[serde(flatten)]
    pub features: FeatureRow,
    pub predictions: f64,
}
