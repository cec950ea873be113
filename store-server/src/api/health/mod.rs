//! Health API

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::db::StorageStats;
use shared::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    environment: String,
    stats: StorageStats,
}

async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    let stats = state.storage.get_stats()?;
    Ok(Json(HealthResponse {
        status: "ok",
        environment: state.config.environment.clone(),
        stats,
    }))
}
