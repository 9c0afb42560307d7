//! HTTP boundary for the forecast service.
//!
//! `POST /api/predict` with `{"symbol": "AAPL"}` answers with the forecast or
//! `{"error": ...}`. Caller and data problems are 400, everything else 500.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::application::pipeline::ForecastService;
use crate::domain::errors::PipelineError;
use crate::interfaces::dto::{PredictRequest, PredictionResponse};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ForecastService>,
}

impl AppState {
    pub fn new(service: Arc<ForecastService>) -> Self {
        Self { service }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Pipeline(err) => {
                if err.is_caller_error() {
                    warn!("Rejected prediction request: {}", err.diagnostic());
                    (StatusCode::BAD_REQUEST, err.to_string())
                } else {
                    error!("Prediction request failed: {}", err.diagnostic());
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let predictor = state.service.context().predictor();
    Json(json!({
        "status": "ok",
        "model": predictor.name(),
        "model_version": predictor.version(),
    }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Unreadable prediction request: {}", rejection.body_text());
        ApiError::BadRequest("No symbol provided".to_string())
    })?;
    let symbol = request.ticker().map_err(|e| {
        warn!("Rejected symbol {:?}: {}", request.symbol, e);
        ApiError::BadRequest(e.to_string())
    })?;

    info!("Processing prediction request for {}", symbol);
    let report = state.service.predict(&symbol).await?;
    Ok(Json(PredictionResponse::from(report)))
}
