//! HTTP route tests driven through the router with `oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

use feed_relay::api::{BroadcastResponse, HealthResponse, StatsResponse};
use feed_relay::config::Settings;
use feed_relay::server::{create_app, AppState};
use feed_relay::websocket::OutboundMessage;

fn test_app() -> (Router, AppState) {
    let state = AppState::new(Settings::default());
    (create_app(state.clone()), state)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn frame_text(message: OutboundMessage) -> String {
    match message {
        OutboundMessage::Serialized(json) => json.to_string(),
        other => panic!("unexpected outbound message: {:?}", other),
    }
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_index_renders_page() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains(r#"id="text-output""#));
    assert!(body.contains(r#"data-uuid="""#));
}

#[tokio::test]
async fn test_share_page_embeds_doc_id() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/share/doc-7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains(r#"data-uuid="doc-7""#));
}

// =============================================================================
// Update trigger
// =============================================================================

#[tokio::test]
async fn test_get_update_broadcasts_query_text() {
    let (app, state) = test_app();
    let (tx, mut rx) = mpsc::channel(4);
    state.connection_manager.register("doc".to_string(), tx);

    let response = app.oneshot(get("/update?server=hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let receipt: BroadcastResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(receipt.broadcast);
    assert_eq!(receipt.delivered_to, 1);
    assert_eq!(frame_text(rx.recv().await.unwrap()), r#"{"message":"hello"}"#);
}

#[tokio::test]
async fn test_index_with_server_query_broadcasts() {
    let (app, state) = test_app();
    let (tx, mut rx) = mpsc::channel(4);
    state.connection_manager.register("doc".to_string(), tx);

    let response = app.oneshot(get("/?server=from-index")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(frame_text(rx.recv().await.unwrap()), r#"{"message":"from-index"}"#);
}

#[tokio::test]
async fn test_post_update_broadcasts_body_text() {
    let (app, state) = test_app();
    let (tx1, mut rx1) = mpsc::channel(4);
    let (tx2, mut rx2) = mpsc::channel(4);
    state.connection_manager.register("a".to_string(), tx1);
    state.connection_manager.register("b".to_string(), tx2);

    let response = app
        .oneshot(post_json("/update", r#"{"server": "posted"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let receipt: BroadcastResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(receipt.delivered_to, 2);
    assert_eq!(receipt.failed, 0);
    for rx in [&mut rx1, &mut rx2] {
        assert_eq!(frame_text(rx.recv().await.unwrap()), r#"{"message":"posted"}"#);
    }
}

#[tokio::test]
async fn test_post_update_ignores_content_type() {
    for content_type in [Some("application/x-www-form-urlencoded"), Some("text/plain"), None] {
        let (app, state) = test_app();
        let (tx, mut rx) = mpsc::channel(4);
        state.connection_manager.register("doc".to_string(), tx);

        let response = app
            .oneshot(post_raw("/update", content_type, r#"{"server": "posted"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED, "content type {:?}", content_type);

        let receipt: BroadcastResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(receipt.broadcast);
        assert_eq!(receipt.delivered_to, 1);
        assert_eq!(frame_text(rx.recv().await.unwrap()), r#"{"message":"posted"}"#);
    }
}

#[tokio::test]
async fn test_post_update_without_server_field_is_ignored() {
    let (app, _) = test_app();

    let response = app.oneshot(post_json("/update", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let receipt: BroadcastResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(!receipt.broadcast);
    assert_eq!(receipt.delivered_to, 0);
}

#[tokio::test]
async fn test_post_update_rejects_invalid_json() {
    let (app, _) = test_app();

    let response = app.oneshot(post_json("/update", "not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("VALIDATION_ERROR"));
}

// =============================================================================
// Health, stats & metrics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_stats_counts_sessions_per_document() {
    let (app, state) = test_app();
    let (tx1, _rx1) = mpsc::channel(4);
    let (tx2, _rx2) = mpsc::channel(4);
    state.connection_manager.register("shared".to_string(), tx1);
    state.connection_manager.register("shared".to_string(), tx2);

    let response = app.oneshot(get("/stats")).await.unwrap();
    let stats: StatsResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(stats.total_connections, 2);
    assert_eq!(stats.documents, 1);
    assert_eq!(stats.sessions_per_document.get("shared"), Some(&2));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("feed_relay_connections_active"));
}
