//! Index page, share page and the update trigger.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::metrics::BroadcastMetrics;
use crate::server::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Query string accepted by the page routes
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    /// Text to broadcast instead of rendering the page
    pub server: Option<String>,
}

/// Body of `POST /update`
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub server: Option<String>,
}

/// Receipt returned for update requests
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// Whether a broadcast happened
    pub broadcast: bool,
    pub delivered_to: usize,
    pub failed: usize,
    pub timestamp: DateTime<Utc>,
}

/// GET / and GET /update
pub async fn index(State(state): State<AppState>, Query(query): Query<UpdateQuery>) -> Response {
    tracing::info!("Index requested");
    page_or_broadcast(&state, query, "").await
}

/// GET /share/{doc_id}
pub async fn share(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(query): Query<UpdateQuery>,
) -> Response {
    tracing::info!(doc_id = %doc_id, "Share page requested");
    page_or_broadcast(&state, query, &doc_id).await
}

/// POST /update
///
/// The body is decoded as JSON whatever `Content-Type` the caller sends.
pub async fn update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BroadcastResponse>)> {
    let request: UpdateRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid update body: {}", e)))?;

    Ok((StatusCode::ACCEPTED, Json(broadcast_text(&state, request.server).await)))
}

async fn page_or_broadcast(state: &AppState, query: UpdateQuery, doc_id: &str) -> Response {
    match query.server {
        Some(text) => (
            StatusCode::ACCEPTED,
            Json(broadcast_text(state, Some(text)).await),
        )
            .into_response(),
        None => Html(render_index(doc_id)).into_response(),
    }
}

async fn broadcast_text(state: &AppState, text: Option<String>) -> BroadcastResponse {
    let Some(text) = text else {
        tracing::debug!("Update without text, nothing to broadcast");
        return BroadcastResponse {
            broadcast: false,
            delivered_to: 0,
            failed: 0,
            timestamp: Utc::now(),
        };
    };

    tracing::info!(length = text.len(), "Received update");
    BroadcastMetrics::record_http();
    let result = state.connection_manager.broadcast(&text).await;

    BroadcastResponse {
        broadcast: true,
        delivered_to: result.delivered,
        failed: result.failed,
        timestamp: Utc::now(),
    }
}

/// Render the index page for a document id (empty for a fresh page)
pub fn render_index(doc_id: &str) -> String {
    INDEX_TEMPLATE.replace("{{ uuid }}", &escape_html(doc_id))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_embeds_doc_id() {
        let page = render_index("abc-123");
        assert!(page.contains(r#"data-uuid="abc-123""#));
        assert!(page.contains(r#"id="text-output""#));
    }

    #[test]
    fn test_render_index_escapes_doc_id() {
        let page = render_index(r#""><script>"#);
        assert!(!page.contains("<script>\""));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
    }
}
