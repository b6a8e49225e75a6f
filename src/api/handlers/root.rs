use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Fitmat API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Class booking and membership backend for fitness studios",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
