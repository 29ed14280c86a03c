use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::misc::{FEATURE_COLUMNS, FeatureRow, NUM_FEATURES, column_index};

/// Column-wise min-max scaling into `[0, 1]`, fitted on one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: [f64; NUM_FEATURES],
    max: [f64; NUM_FEATURES],
}

impl MinMaxScaler {
    pub fn fit(rows: &[FeatureRow]) -> Result<Self, FeatureError> {
        if rows.is_empty() {
            return Err(FeatureError::EmptyScalerFit);
        }

        let mut min = [f64::INFINITY; NUM_FEATURES];
        let mut max = [f64::NEG_INFINITY; NUM_FEATURES];
        for row in rows {
            for (idx, value) in row.values().into_iter().enumerate() {
                if !value.is_finite() {
                    return Err(FeatureError::NonFiniteValue {
                        column: FEATURE_COLUMNS[idx],
                        date: row.date.map(|d| d.to_string()).unwrap_or_default(),
                    });
                }
                min[idx] = min[idx].min(value);
                max[idx] = max[idx].max(value);
            }
        }

        Ok(Self { min, max })
    }

    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut values = row.values();
        for (idx, value) in values.iter_mut().enumerate() {
            *value = self.scale_value(idx, *value);
        }
        FeatureRow::from_values(row.date, values)
    }

    pub fn inverse_transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut values = row.values();
        for (idx, value) in values.iter_mut().enumerate() {
            *value = self.unscale_value(idx, *value);
        }
        FeatureRow::from_values(row.date, values)
    }

    /// Maps one scaled value of `column` back to its original units.
    pub fn inverse_column(&self, column: &str, value: f64) -> Result<f64, FeatureError> {
        let idx = column_index(column).ok_or_else(|| FeatureError::UnknownColumn(column.to_string()))?;
        Ok(self.unscale_value(idx, value))
    }

    fn scale_value(&self, idx: usize, value: f64) -> f64 {
        let range = self.max[idx] - self.min[idx];
        // constant column
        if range == 0.0 {
            return 0.0;
        }
        (value - self.min[idx]) / range
    }

    fn unscale_value(&self, idx: usize, value: f64) -> f64 {
        value * (self.max[idx] - self.min[idx]) + self.min[idx]
    }
}
