use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use data_ingestion::error::DataIngestionError;
use feature_processing::error::FeatureError;
use log::{error, warn};
use quantum_model::error::ModelError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    MarketData(#[from] DataIngestionError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MarketData(DataIngestionError::MissingTicker) => StatusCode::BAD_REQUEST,
            ApiError::Features(
                FeatureError::EmptyTable | FeatureError::MissingColumn(_) | FeatureError::CsvError(_),
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Rejected request: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
