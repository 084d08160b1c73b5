use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_connections: usize,
    pub documents: usize,
    pub sessions_per_document: std::collections::HashMap<String, usize>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let conn_stats = state.connection_manager.stats();

    Json(StatsResponse {
        total_connections: conn_stats.total_connections,
        documents: conn_stats.documents,
        sessions_per_document: conn_stats.sessions_per_document,
    })
}
