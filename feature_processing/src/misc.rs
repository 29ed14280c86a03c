use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const NUM_FEATURES: usize = 8;

pub const DAILY_RETURN: &str = "daily_return";
pub const FIVE_DAY_MOVING_AVG: &str = "5_day_moving_avg";
pub const THIRTY_DAY_MOVING_AVG: &str = "30_day_moving_avg";

/// Model input columns, in the order the model consumes them.
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    DAILY_RETURN,
    FIVE_DAY_MOVING_AVG,
    THIRTY_DAY_MOVING_AVG,
];

/// A price bar plus its derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(
        default,
        alias = "",
        alias = "Unnamed: 0",
        deserialize_with = "csv::invalid_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub daily_return: f64,
    #[serde(rename = "5_day_moving_avg")]
    pub five_day_moving_avg: f64,
    #[serde(rename = "30_day_moving_avg")]
    pub thirty_day_moving_avg: f64,
}

impl FeatureRow {
    pub fn from_values(date: Option<NaiveDate>, values: [f64; NUM_FEATURES]) -> Self {
        let [open, high, low, close, volume, daily_return, five, thirty] = values;
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            daily_return,
            five_day_moving_avg: five,
            thirty_day_moving_avg: thirty,
        }
    }

    pub fn values(&self) -> [f64; NUM_FEATURES] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.daily_return,
            self.five_day_moving_avg,
            self.thirty_day_moving_avg,
        ]
    }

    pub fn value(&self, column: &str) -> Option<f64> {
        column_index(column).map(|idx| self.values()[idx])
    }
}

pub fn column_index(column: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == column)
}
