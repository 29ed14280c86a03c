use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Feature table is empty.")]
    EmptyTable,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Cannot fit a scaler on an empty table")]
    EmptyScalerFit,

    #[error("Input contains a non-finite {column} value at {date:?}")]
    NonFiniteValue { column: &'static str, date: String },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),
}
