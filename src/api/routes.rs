use axum::{routing::get, Router};

use crate::server::AppState;

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::page::{index, share, update};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Pages (a `server` query parameter turns them into update triggers)
        .route("/", get(index))
        .route("/share/{doc_id}", get(share))
        .route("/update", get(index).post(update))
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
}
