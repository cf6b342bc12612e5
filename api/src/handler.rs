use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use chrono::Local;
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::config::{APP_TITLE, APP_VERSION};
use crate::error::ApiError;
use crate::schema::{
    clamp_prediction, BatchItem, BatchResult, HealthResponse, PredictionResult,
};
use crate::validate::RULES;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": APP_TITLE,
        "version": APP_VERSION,
        "health": "/health",
        "endpoints": {
            "predict": "/predict",
            "batch_predict": "/predict/batch",
            "validation_rules": "/validation-rules",
            "client": "/app/"
        }
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_name = state.model.as_ref().map(|m| m.name().to_string());
    Json(HealthResponse {
        status: if model_name.is_some() { "healthy" } else { "unhealthy" },
        model_loaded: model_name.is_some(),
        model_name,
        timestamp: Local::now(),
    })
}

pub async fn validation_rules(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "rules": RULES,
        "strict_categories": state.validator.is_strict(),
        "max_batch_size": state.max_batch_size,
    }))
}

pub async fn predict_revenue(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(raw) = payload?;
    let record = state.validator.record(&raw)?;
    let model = state.model()?;

    info!(
        person_type = %record.person_type,
        order_qty = record.order_qty,
        "prediction request"
    );
    let prediction = clamp_prediction(model.predict(&record)?);
    info!(prediction = %format_args!("{prediction:.2}"), "prediction successful");

    Ok(Json(PredictionResult {
        success: true,
        prediction,
        input_data: record,
        timestamp: Local::now(),
        model_name: model.name().to_string(),
    }))
}

pub async fn predict_revenue_batch(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchResult>, ApiError> {
    let Json(raw) = payload?;
    let records = state.validator.batch(&raw, state.max_batch_size)?;
    let model = state.model()?;

    info!(records = records.len(), "batch prediction request");
    let predictions = model.predict_batch(&records)?;

    let predictions: Vec<BatchItem> = records
        .into_iter()
        .zip(predictions)
        .enumerate()
        .map(|(index, (input_data, raw))| BatchItem {
            index,
            prediction: clamp_prediction(raw),
            input_data,
        })
        .collect();
    info!(records = predictions.len(), "batch prediction successful");

    Ok(Json(BatchResult {
        success: true,
        total_records: predictions.len(),
        predictions,
        timestamp: Local::now(),
    }))
}
