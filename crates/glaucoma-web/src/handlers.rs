//! HTTP处理器

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use glaucoma_core::Result;
use serde_json::json;
use tracing::error;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .route("/ping", get(ping))
        .route("/health", get(health))
        .route("/api/feedback/ping", get(feedback_ping))
}

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Glaucoma XAI Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "auth": "/api/auth",
            "patients": "/api/patients",
            "predict": "/api/predict/",
            "support_tickets": "/api/support-tickets",
            "doctors": "/api/doctors"
        }
    }))
}

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "status": "ok", "msg": "Backend running successfully" }))
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse> {
    if let Err(e) = state.db.ping().await {
        error!("Health check failed: {}", e);
        return Err(e);
    }

    Ok(Json(json!({
        "status": "healthy",
        "database": "ok",
        "model_loaded": state.predictor.is_loaded(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

async fn feedback_ping() -> impl IntoResponse {
    Json(json!({ "msg": "feedback router ok" }))
}
