//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{infrastructure::dto::http::MembersDto, ui::state::AppState};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current members and registry counters
pub async fn get_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MembersDto>, StatusCode> {
    match state.relay.snapshot().await {
        // Relay の状態から DTO への変換
        Ok(snapshot) => Ok(Json(snapshot.into())),
        Err(e) => {
            tracing::error!("Failed to get registry snapshot: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
