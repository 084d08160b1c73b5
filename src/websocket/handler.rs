use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::connection_manager::ConnectionHandle;
use crate::error::AppError;
use crate::metrics::{
    BroadcastMetrics, WsMessageMetrics, WS_CONNECTIONS_CLOSED, WS_CONNECTIONS_OPENED,
    WS_CONNECTIONS_REJECTED, WS_CONNECTION_DURATION,
};
use crate::server::AppState;

use super::message::{FeedFrame, OutboundMessage};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// WebSocket upgrade handler for `/ws` (new document)
#[tracing::instrument(name = "ws.upgrade", skip(ws, state, headers))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    upgrade(ws, state, &headers, None)
}

/// WebSocket upgrade handler for `/ws/{doc_id}` (shared document)
#[tracing::instrument(name = "ws.upgrade", skip(ws, state, headers))]
pub async fn ws_shared_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    upgrade(ws, state, &headers, Some(doc_id))
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    headers: &HeaderMap,
    doc_id: Option<String>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());

    if !is_origin_allowed(&state.settings.server, origin) {
        WS_CONNECTIONS_REJECTED.inc();
        tracing::warn!(origin = ?origin, "WebSocket origin rejected");
        return AppError::Forbidden("Cross origin websockets not allowed".to_string())
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, doc_id))
}

/// Origin policy for WebSocket upgrades.
///
/// Debug mode accepts everything. Otherwise the origin's host must end with
/// one of `allowed_origins`. Requests without an `Origin` header (non-browser
/// clients) are accepted.
pub fn is_origin_allowed(config: &ServerConfig, origin: Option<&str>) -> bool {
    if config.debug {
        return true;
    }

    let Some(origin) = origin else {
        return true;
    };

    let host = origin_host(origin);
    config
        .allowed_origins
        .iter()
        .any(|suffix| !suffix.is_empty() && host.ends_with(suffix.as_str()))
}

/// Host part of an `Origin` header value (`scheme://host[:port]`)
fn origin_host(origin: &str) -> &str {
    let rest = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    let authority = rest.split('/').next().unwrap_or(rest);
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    }
}

/// Handle an established WebSocket session
#[tracing::instrument(
    name = "ws.connection",
    skip(socket, state),
    fields(shared = requested_doc.is_some())
)]
async fn handle_socket(socket: WebSocket, state: AppState, requested_doc: Option<String>) {
    let connection_start = Instant::now();

    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(CHANNEL_BUFFER_SIZE);

    let doc_id = match requested_doc {
        Some(doc_id) => {
            // A shared page is told its document id before anything else
            if tx.send(OutboundMessage::Frame(FeedFrame::new(doc_id.as_str()))).await.is_err() {
                return;
            }
            tracing::info!(doc_id = %doc_id, "New client sharing document");
            doc_id
        }
        None => {
            let doc_id = Uuid::new_v4().to_string();
            tracing::info!(doc_id = %doc_id, "New client with generated document");
            doc_id
        }
    };

    let handle = state.connection_manager.register(doc_id.clone(), tx);
    let connection_id = handle.id;

    WS_CONNECTIONS_OPENED.inc();

    tracing::info!(
        connection_id = %connection_id,
        doc_id = %doc_id,
        "WebSocket connection established"
    );

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let closing = matches!(outbound, OutboundMessage::Close);
            let msg = match outbound.into_ws_message() {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };

            if ws_sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    // Task for receiving messages from WebSocket
    let recv_state = state.clone();
    let recv_handle = handle.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) => {
                    if !process_message(msg, &recv_state, &recv_handle).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task completed");
            send_task.abort();
        }
        _ = handle.evicted() => {
            tracing::debug!(connection_id = %connection_id, "Session evicted by registry");
            send_task.abort();
            recv_task.abort();
        }
    }

    state.connection_manager.unregister(connection_id);

    WS_CONNECTIONS_CLOSED.inc();
    let duration = connection_start.elapsed().as_secs_f64();
    WS_CONNECTION_DURATION.observe(duration);

    tracing::info!(
        connection_id = %connection_id,
        doc_id = %doc_id,
        duration_secs = duration,
        "WebSocket connection closed"
    );
}

/// Process a received WebSocket message
/// Returns false if the session should be closed
async fn process_message(msg: Message, state: &AppState, handle: &Arc<ConnectionHandle>) -> bool {
    match msg {
        Message::Text(text) => {
            handle.update_activity();
            WsMessageMetrics::record_text();

            tracing::info!(
                connection_id = %handle.id,
                doc_id = %handle.doc_id,
                page_no = %text.as_str(),
                "Got message"
            );

            // Every page is told which document was just touched
            BroadcastMetrics::record_session();
            state.connection_manager.broadcast(&handle.doc_id).await;
            true
        }
        Message::Binary(_) => {
            handle.update_activity();
            WsMessageMetrics::record_binary();
            tracing::warn!(connection_id = %handle.id, "Ignoring binary frame");
            true
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Axum answers pings itself
            handle.update_activity();
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %handle.id, "Received close frame");
            false
        }
    }
}
