//! Connection registry - manages all active WebSocket sessions

use dashmap::DashMap;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use super::stats::ConnectionStats;
use super::types::ConnectionHandle;
use crate::metrics::BroadcastMetrics;
use crate::websocket::{FeedFrame, OutboundMessage};

/// Per-session deadline for queueing a broadcast frame
const BROADCAST_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BroadcastResult {
    pub delivered: usize,
    pub failed: usize,
}

/// Manages all active WebSocket sessions
pub struct ConnectionManager {
    /// connection_id -> ConnectionHandle
    connections: DashMap<Uuid, Arc<ConnectionHandle>>,
    /// doc_id -> Set<connection_id> (several pages may share one document)
    document_index: DashMap<String, HashSet<Uuid>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            document_index: DashMap::new(),
        }
    }

    /// Register a new session
    pub fn register(
        &self,
        doc_id: String,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Arc<ConnectionHandle> {
        let handle = Arc::new(ConnectionHandle::new(doc_id.clone(), sender));
        let conn_id = handle.id;

        self.connections.insert(conn_id, handle.clone());
        self.document_index.entry(doc_id).or_default().insert(conn_id);

        tracing::info!(connection_id = %conn_id, doc_id = %handle.doc_id, "Connection registered");

        handle
    }

    /// Unregister a session. Returns false if it was not registered.
    pub fn unregister(&self, connection_id: Uuid) -> bool {
        let Some((_, handle)) = self.connections.remove(&connection_id) else {
            return false;
        };

        if let Some(mut doc_conns) = self.document_index.get_mut(&handle.doc_id) {
            doc_conns.remove(&connection_id);
            if doc_conns.is_empty() {
                drop(doc_conns);
                self.document_index
                    .remove_if(&handle.doc_id, |_, conns| conns.is_empty());
            }
        }

        tracing::info!(connection_id = %connection_id, doc_id = %handle.doc_id, "Connection unregistered");
        true
    }

    /// Get connection by ID
    pub fn get_connection(&self, connection_id: Uuid) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|h| h.clone())
    }

    /// Get all sessions opened for a document
    pub fn get_document_connections(&self, doc_id: &str) -> Vec<Arc<ConnectionHandle>> {
        self.document_index
            .get(doc_id)
            .map(|conn_ids| {
                conn_ids
                    .iter()
                    .filter_map(|id| self.connections.get(id).map(|h| h.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections
    pub fn get_all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send `{"message": text}` to every registered session.
    ///
    /// The frame is serialized once. A session that cannot take the frame
    /// within the send deadline counts as failed; the others still receive it.
    pub async fn broadcast(&self, text: &str) -> BroadcastResult {
        let connections = self.get_all_connections();

        tracing::info!(sessions = connections.len(), "Broadcasting message");

        if connections.is_empty() {
            return BroadcastResult::default();
        }

        let outbound = match OutboundMessage::preserialized(&FeedFrame::new(text)) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast frame");
                return BroadcastResult {
                    delivered: 0,
                    failed: connections.len(),
                };
            }
        };

        let sends = connections.iter().map(|handle| {
            let outbound = outbound.clone();
            async move {
                match timeout(BROADCAST_SEND_TIMEOUT, handle.send_outbound(outbound)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        tracing::error!(connection_id = %handle.id, "Error sending message, session closed");
                        false
                    }
                    Err(_) => {
                        tracing::error!(connection_id = %handle.id, "Error sending message, send timed out");
                        false
                    }
                }
            }
        });

        let outcomes = join_all(sends).await;
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let result = BroadcastResult {
            delivered,
            failed: outcomes.len() - delivered,
        };

        BroadcastMetrics::record_delivery(result.delivered, result.failed);
        result
    }

    /// Ask every session to close (used on shutdown)
    pub async fn close_all(&self) -> usize {
        let connections = self.get_all_connections();
        let mut closed = 0;
        for handle in connections {
            if handle.send_outbound(OutboundMessage::Close).await.is_ok() {
                closed += 1;
            }
        }
        closed
    }

    /// Get statistics
    pub fn stats(&self) -> ConnectionStats {
        let sessions_per_document: HashMap<String, usize> = self
            .document_index
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();

        ConnectionStats {
            total_connections: self.connections.len(),
            documents: sessions_per_document.len(),
            sessions_per_document,
        }
    }

    /// Find sessions that have been inactive for longer than the timeout
    pub fn find_stale_connections(&self, timeout_secs: u64) -> Vec<Uuid> {
        let now = chrono::Utc::now();
        let timeout = chrono::Duration::seconds(timeout_secs as i64);

        self.connections
            .iter()
            .filter(|entry| now.signed_duration_since(entry.value().last_activity()) > timeout)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Close and remove stale sessions, returning how many were removed
    pub async fn cleanup_stale_connections(&self, timeout_secs: u64) -> usize {
        let stale = self.find_stale_connections(timeout_secs);
        let mut removed = 0;

        for conn_id in stale {
            tracing::info!(connection_id = %conn_id, "Removing stale connection due to timeout");
            if let Some(handle) = self.get_connection(conn_id) {
                if let Err(e) = handle.sender.try_send(OutboundMessage::Close) {
                    tracing::warn!(
                        connection_id = %conn_id,
                        error = %e,
                        "Could not queue close frame, aborting session"
                    );
                }
                handle.evict();
            }
            if self.unregister(conn_id) {
                removed += 1;
            }
        }

        removed
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
