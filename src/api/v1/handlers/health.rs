/*
 * Responsibility
 * - GET /health (liveness + cache reachability)
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{services::cache::StoreHealth, state::AppState};

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(err) => {
            tracing::warn!(
                backend = state.store.backend_name(),
                error = %err,
                "cache ping failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "cache down"})),
            )
        }
    }
}
