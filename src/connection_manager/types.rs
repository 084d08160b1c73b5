//! Connection handle and related types

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::websocket::OutboundMessage;

/// Handle for a single WebSocket session
pub struct ConnectionHandle {
    pub id: Uuid,
    /// Document the session was opened for (generated for plain `/ws`)
    pub doc_id: String,
    pub sender: mpsc::Sender<OutboundMessage>,
    /// Last activity timestamp (Unix seconds)
    last_activity: AtomicI64,
    /// Signalled when the registry drops the session
    evicted: Notify,
}

impl ConnectionHandle {
    pub fn new(doc_id: String, sender: mpsc::Sender<OutboundMessage>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doc_id,
            sender,
            last_activity: AtomicI64::new(now.timestamp()),
            evicted: Notify::new(),
        }
    }

    pub fn update_activity(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.last_activity.load(Ordering::Relaxed), 0)
            .unwrap_or_else(Utc::now)
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&self, at: DateTime<Utc>) {
        self.last_activity.store(at.timestamp(), Ordering::Relaxed);
    }

    /// Tell the session's socket tasks to stop. The signal is kept until
    /// [`ConnectionHandle::evicted`] is awaited.
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once [`ConnectionHandle::evict`] has been called
    pub async fn evicted(&self) {
        self.evicted.notified().await
    }

    /// Queue an outbound message
    pub async fn send_outbound(
        &self,
        message: OutboundMessage,
    ) -> Result<(), mpsc::error::SendError<OutboundMessage>> {
        self.sender.send(message).await
    }
}
