use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use data_ingestion::fetcher::{DateRange, StockDataClient};
use feature_processing::misc::FeatureRow;
use feature_processing::processor::prepare_features;
use feature_processing::scaler::MinMaxScaler;
use feature_processing::table::read_feature_rows;
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::chart::{ChartSeries, LineChart};
use crate::config::ServerConfig;
use crate::engine::InferenceEngine;
use crate::error::ApiError;
use crate::misc::PredictionRow;

const UPLOAD_FIELD: &str = "file";
const ACTUAL_COLOR: &str = "#1f77b4";
const PREDICTED_COLOR: &str = "#ff7f0e";

/// Shared application state. The engine is read-only after startup.
#[derive(Clone)]
struct AppState {
    engine: Arc<InferenceEngine>,
    market_data: Arc<StockDataClient>,
    default_ticker: Arc<str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    #[default]
    Json,
    Svg,
}

#[derive(Debug, Deserialize)]
struct FetchStockParams {
    ticker: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    scale: Option<bool>,
    format: Option<OutputFormat>,
}

/// POST /predict returns the uploaded rows with a `predictions` column.
async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<PredictionRow>>, ApiError> {
    info!("predicting");
    let rows = read_upload(multipart).await?;
    let (rows, predictions) = run_predictions(&state.engine, rows).await?;

    Ok(Json(
        rows.into_iter()
            .zip(predictions)
            .map(|(features, predictions)| PredictionRow {
                features,
                predictions,
            })
            .collect(),
    ))
}

/// POST /predict_image charts uploaded close prices against predictions.
async fn predict_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let rows = read_upload(multipart).await?;
    prediction_chart(&state, "Uploaded data", rows, None).await
}

/// GET /fetch_stock?ticker=<symbol>[&start=&end=&scale=&format=]
async fn fetch_stock(
    State(state): State<AppState>,
    query: Result<Query<FetchStockParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let ticker = params
        .ticker
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Ticker symbol is required.".to_string()))?;

    if let (Some(start), Some(end)) = (params.start, params.end) {
        if start > end {
            return Err(ApiError::BadRequest(format!(
                "start ({start}) is after end ({end})"
            )));
        }
    }

    let range = DateRange {
        start: params.start,
        end: params.end,
    };
    let bars = state.market_data.fetch_daily(ticker, Some(range)).await?;
    let prepared = prepare_features(&bars, params.scale.unwrap_or(true))?;
    info!("Data preprocessing complete.");

    match params.format.unwrap_or_default() {
        OutputFormat::Json => Ok(Json(prepared.rows).into_response()),
        OutputFormat::Svg => {
            prediction_chart(&state, ticker, prepared.rows, prepared.scaler.as_ref()).await
        }
    }
}

/// GET /default_stock_image charts the configured default ticker.
async fn default_stock_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let ticker = state.default_ticker.clone();
    let bars = state.market_data.fetch_daily(&ticker, None).await?;
    let prepared = prepare_features(&bars, true)?;

    prediction_chart(&state, &ticker, prepared.rows, prepared.scaler.as_ref()).await
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model_loaded": state.engine.model_loaded(),
    }))
}

async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Vec<FeatureRow>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Field read error: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty.".to_string()));
        }

        let rows = read_feature_rows(data.as_ref())?;
        debug!("Parsed {} uploaded rows", rows.len());
        return Ok(rows);
    }

    Err(ApiError::BadRequest("No file uploaded.".to_string()))
}

/// Model evaluation is CPU-bound, so it runs on the blocking pool.
async fn run_predictions(
    engine: &Arc<InferenceEngine>,
    rows: Vec<FeatureRow>,
) -> Result<(Vec<FeatureRow>, Vec<f64>), ApiError> {
    let engine = Arc::clone(engine);
    let (rows, predictions) = tokio::task::spawn_blocking(move || {
        let predictions = engine.predict(&rows);
        (rows, predictions)
    })
    .await?;

    Ok((rows, predictions?))
}

/// Renders actual vs. predicted close. With a scaler both series are
/// mapped back to prices.
async fn prediction_chart(
    state: &AppState,
    title: &str,
    rows: Vec<FeatureRow>,
    scaler: Option<&MinMaxScaler>,
) -> Result<Response, ApiError> {
    let (rows, predictions) = run_predictions(&state.engine, rows).await?;
    let actual: Vec<f64> = rows.iter().map(|row| row.close).collect();

    let (actual, predictions, y_label) = match scaler {
        Some(scaler) => (
            unscale_close(scaler, &actual)?,
            unscale_close(scaler, &predictions)?,
            "Close price",
        ),
        None => (actual, predictions, "Close"),
    };

    let chart = LineChart {
        title: format!("{title}: predicted vs. actual close"),
        y_label: y_label.to_string(),
        x_labels: rows
            .iter()
            .enumerate()
            .map(|(idx, row)| row.date.map(|d| d.to_string()).unwrap_or_else(|| idx.to_string()))
            .collect(),
        series: vec![
            ChartSeries {
                label: "Actual".to_string(),
                color: ACTUAL_COLOR,
                values: actual,
            },
            ChartSeries {
                label: "Predicted".to_string(),
                color: PREDICTED_COLOR,
                values: predictions,
            },
        ],
    };

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], chart.to_svg()).into_response())
}

fn unscale_close(scaler: &MinMaxScaler, values: &[f64]) -> Result<Vec<f64>, ApiError> {
    values
        .iter()
        .map(|v| scaler.inverse_column("close", *v).map_err(ApiError::from))
        .collect()
}

pub struct Server {
    state: AppState,
    host: String,
    port: u16,
    max_upload_bytes: usize,
}

impl Server {
    pub fn init(config: &ServerConfig, engine: InferenceEngine, market_data: StockDataClient) -> Self {
        let state = AppState {
            engine: Arc::new(engine),
            market_data: Arc::new(market_data),
            default_ticker: Arc::from(config.default_ticker.as_str()),
        };

        Self {
            state,
            host: config.host.clone(),
            port: config.port,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600));

        Router::new()
            .route("/predict", post(predict))
            .route("/predict_image", post(predict_image))
            .route("/fetch_stock", get(fetch_stock))
            .route("/default_stock_image", get(default_stock_image))
            .route("/health", get(health))
            .layer(DefaultBodyLimit::max(self.max_upload_bytes))
            .layer(cors)
            .with_state(self.state.clone())
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        info!("HTTP server running on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal, initiating graceful shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use data_ingestion::config::AlphaVantageConfig;
    use quantum_model::model::HybridModel;
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "qnn-test-boundary";
    const HEADER: &str = "open,high,low,close,volume,daily_return,5_day_moving_avg,30_day_moving_avg";

    fn app() -> Router {
        app_with_provider("http://127.0.0.1:9/query")
    }

    fn app_with_provider(base_url: &str) -> Router {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            model_path: String::new(),
            num_qubits: 4,
            reps: 1,
            seed: 42,
            default_ticker: "AAPL".to_string(),
            max_upload_bytes: 1024 * 1024,
        };
        let mut market = AlphaVantageConfig::with_api_key("test");
        market.base_url = base_url.to_string();

        let engine = InferenceEngine::new(HybridModel::new(4, 1, 42).unwrap(), false);
        Server::init(&config, engine, StockDataClient::new(market).unwrap()).router()
    }

    fn multipart_request(uri: &str, field: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"rows.csv\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    /// `TIME_SERIES_DAILY` payload with one bar per day from 2024-01-01.
    fn daily_payload(days: usize) -> Value {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series: serde_json::Map<String, Value> = (0..days)
            .map(|i| {
                let close = daily_close(i);
                let date = start + chrono::Duration::days(i as i64);
                (
                    date.to_string(),
                    json!({
                        "1. open": format!("{:.4}", close - 0.5),
                        "2. high": format!("{:.4}", close + 1.0),
                        "3. low": format!("{:.4}", close - 1.0),
                        "4. close": format!("{:.4}", close),
                        "5. volume": format!("{}", 1_000_000 + i * 1_000),
                    }),
                )
            })
            .collect();

        json!({
            "Meta Data": { "2. Symbol": "TEST" },
            "Time Series (Daily)": series,
        })
    }

    fn daily_close(i: usize) -> f64 {
        150.0 + i as f64 + (i % 3) as f64 * 0.25
    }

    /// Serves `daily_payload(40)` for any query and returns its URL.
    async fn stub_provider() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let provider = Router::new().route("/query", get(|| async { Json(daily_payload(40)) }));
        tokio::spawn(async move {
            axum::serve(listener, provider).await.unwrap();
        });
        format!("http://{addr}/query")
    }

    async fn get_request(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Numeric y-axis labels (top and bottom of the frame).
    fn y_axis_labels(svg: &str) -> Vec<f64> {
        svg.lines()
            .filter(|line| line.contains(r#"x="72""#) && line.contains(r#"text-anchor="end""#))
            .filter_map(|line| {
                let start = line.find('>')? + 1;
                let end = line.find("</text>")?;
                line[start..end].parse().ok()
            })
            .collect()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn fetch_stock_without_ticker_is_bad_request() {
        for uri in ["/fetch_stock", "/fetch_stock?ticker=", "/fetch_stock?ticker=%20%20"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["error"], "Ticker symbol is required.");
        }
    }

    #[tokio::test]
    async fn fetch_stock_with_bad_dates_is_bad_request() {
        for uri in [
            "/fetch_stock?ticker=IBM&start=yesterday",
            "/fetch_stock?ticker=IBM&start=2024-02-01&end=2024-01-01",
        ] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(json_body(response).await.get("error").is_some());
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_server_error() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/fetch_stock?ticker=IBM")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn fetch_stock_returns_rows_after_warmup() {
        let app = app_with_provider(&stub_provider().await);
        let response = get_request(app, "/fetch_stock?ticker=IBM").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 40 - 29);
        assert_eq!(rows[0]["date"], "2024-01-30");
        assert_eq!(rows[10]["date"], "2024-02-09");
        for row in rows {
            let close = row["close"].as_f64().unwrap();
            assert!((0.0..=1.0).contains(&close), "scaled close {close}");
        }
    }

    #[tokio::test]
    async fn fetch_stock_unscaled_keeps_prices() {
        let app = app_with_provider(&stub_provider().await);
        let response = get_request(app, "/fetch_stock?ticker=IBM&scale=false").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let last = &body.as_array().unwrap()[10];
        assert!((last["close"].as_f64().unwrap() - daily_close(39)).abs() < 1e-9);
        assert!((last["volume"].as_f64().unwrap() - 1_039_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fetch_stock_applies_date_range() {
        let provider = stub_provider().await;

        let response = get_request(
            app_with_provider(&provider),
            "/fetch_stock?ticker=IBM&start=2024-01-05",
        )
        .await;
        let body = json_body(response).await;
        let rows = body.as_array().unwrap();
        // bars 2024-01-05..=2024-02-09 are 36 days
        assert_eq!(rows.len(), 36 - 29);
        assert_eq!(rows[0]["date"], "2024-02-03");

        let response = get_request(
            app_with_provider(&provider),
            "/fetch_stock?ticker=IBM&end=2024-02-05",
        )
        .await;
        let body = json_body(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 36 - 29);
        assert_eq!(rows[6]["date"], "2024-02-05");

        let response = get_request(
            app_with_provider(&provider),
            "/fetch_stock?ticker=IBM&start=2024-01-20&end=2024-02-05",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_stock_svg_is_in_price_units() {
        let app = app_with_provider(&stub_provider().await);
        let response = get_request(app, "/fetch_stock?ticker=IBM&format=svg").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let svg = text_body(response).await;
        assert!(svg.contains("IBM: predicted vs. actual close"));
        assert!(svg.contains("Close price"));
        assert!(svg.contains("2024-01-30"));

        let labels = y_axis_labels(&svg);
        assert_eq!(labels.len(), 2, "{svg}");
        let (hi, lo) = (labels[0], labels[1]);
        // the actual series spans closes of days 29..=39
        assert!(hi >= daily_close(39) - 0.01, "top label {hi}");
        assert!(lo <= daily_close(29) + 0.01, "bottom label {lo}");
    }

    #[tokio::test]
    async fn default_stock_image_charts_default_ticker() {
        let app = app_with_provider(&stub_provider().await);
        let response = get_request(app, "/default_stock_image").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let svg = text_body(response).await;
        assert!(svg.contains("AAPL: predicted vs. actual close"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(y_axis_labels(&svg)[0] >= daily_close(39) - 0.01);
    }

    #[tokio::test]
    async fn predict_appends_prediction_column() {
        let csv = format!("{HEADER}\n0.1,0.2,0.05,0.15,0.5,0.3,0.12,0.11\n0.2,0.3,0.1,0.25,0.4,0.6,0.2,0.15\n");
        let response = app()
            .oneshot(multipart_request("/predict", "file", &csv))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["close"], 0.15);
        assert!(rows[0]["predictions"].is_f64());
        assert!(rows[1]["30_day_moving_avg"].is_f64());
    }

    #[tokio::test]
    async fn predict_without_file_field_is_bad_request() {
        let response = app()
            .oneshot(multipart_request("/predict", "attachment", "a,b\n1,2\n"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded.");
    }

    #[tokio::test]
    async fn predict_with_empty_file_is_bad_request() {
        let response = app()
            .oneshot(multipart_request("/predict", "file", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn predict_with_missing_columns_is_bad_request() {
        let response = app()
            .oneshot(multipart_request("/predict", "file", "open,close\n1,2\n"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Missing required column: high"
        );
    }

    #[tokio::test]
    async fn predict_without_multipart_body_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/predict")
                    .body(Body::from("plain text"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn predict_image_returns_svg() {
        let csv = format!(",{HEADER}\n2024-01-02,0.1,0.2,0.05,0.15,0.5,0.3,0.12,0.11\n2024-01-03,0.2,0.3,0.1,0.25,0.4,0.6,0.2,0.15\n");
        let response = app()
            .oneshot(multipart_request("/predict_image", "file", &csv))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("2024-01-03"));
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn cors_headers_are_present() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
