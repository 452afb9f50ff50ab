pub mod link_preview;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::error::AppError;

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "og-preview-server",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
