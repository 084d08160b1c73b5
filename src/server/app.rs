use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::api::api_routes;
use crate::websocket::{ws_handler, ws_shared_handler};

use super::AppState;

pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.settings.server.static_dir);

    Router::new()
        // WebSocket endpoints
        .route("/ws", get(ws_handler))
        .route("/ws/{doc_id}", get(ws_shared_handler))
        // Merge API routes
        .merge(api_routes())
        .nest_service("/static", static_files)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}
