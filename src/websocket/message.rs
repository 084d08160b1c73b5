use std::sync::Arc;

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

/// Frame sent from server to client: `{"message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFrame {
    pub message: String,
}

impl FeedFrame {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Anything queued on a session's outbound channel
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Serialized when written to the socket
    Frame(FeedFrame),
    /// Serialized once and shared between sessions (broadcast)
    Serialized(Arc<str>),
    /// Heartbeat ping
    Ping,
    /// Close the session
    Close,
}

impl OutboundMessage {
    pub fn preserialized(frame: &FeedFrame) -> Result<Self, serde_json::Error> {
        Ok(Self::Serialized(serde_json::to_string(frame)?.into()))
    }

    /// Convert to a WebSocket message
    pub fn into_ws_message(self) -> Result<Message, serde_json::Error> {
        Ok(match self {
            Self::Frame(frame) => Message::Text(serde_json::to_string(&frame)?.into()),
            Self::Serialized(json) => Message::Text(json.to_string().into()),
            Self::Ping => Message::Ping(Vec::new().into()),
            Self::Close => Message::Close(None),
        })
    }
}
