/*
 * Responsibility
 * - GET / (greeting) and GET /health, GET /api/health (liveness)
 * - JSON 404 for anything unrouted
 */
use axum::{
    Json,
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use serde_json::json;

use crate::error::AppError;

pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"message": "Hello World!"})))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}
