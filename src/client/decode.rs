use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;

/// Errors produced while turning a frame payload into an [`InboundMessage`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload has no string `message` field")]
    MissingMessage,
}

/// A decoded feed frame
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Text rendered into the output region
    pub message: String,
    /// The whole parsed object, kept for logging
    pub payload: Value,
}

/// Decode a UTF-8 JSON payload.
///
/// The payload must be an object whose `message` field is a string; other
/// fields are carried along in `payload` untouched.
pub fn decode_payload(bytes: &[u8]) -> Result<InboundMessage, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let payload: Value = serde_json::from_str(text)?;

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingMessage)?
        .to_string();

    Ok(InboundMessage { message, payload })
}

/// Decode a WebSocket frame.
///
/// Text and binary frames are both parsed as UTF-8 JSON. Control frames
/// yield `None`.
pub fn decode_frame(frame: &Message) -> Option<Result<InboundMessage, DecodeError>> {
    match frame {
        Message::Text(text) => Some(decode_payload(text.as_bytes())),
        Message::Binary(bytes) => Some(decode_payload(bytes)),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
    }
}
