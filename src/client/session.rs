use std::fmt;
use std::str::FromStr;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::decode::decode_frame;
use super::observer::FeedObserver;
use super::target::feed_url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
}

/// What the session does with a frame that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Log the failure and continue with the next frame
    #[default]
    Skip,
    /// Log the failure and end the session
    Terminate,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "terminate" => Ok(Self::Terminate),
            other => Err(format!(
                "unknown decode policy '{}', expected 'skip' or 'terminate'",
                other
            )),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server sent a close frame
    ServerClosed { code: Option<u16>, reason: String },
    /// The frame stream ended without a close frame
    StreamEnded,
    /// Reading from the transport failed
    TransportError(String),
    /// A frame failed to decode under [`DecodePolicy::Terminate`]
    DecodeFailed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerClosed { code: Some(code), reason } if !reason.is_empty() => {
                write!(f, "closed by server ({}: {})", code, reason)
            }
            Self::ServerClosed { code: Some(code), .. } => write!(f, "closed by server ({})", code),
            Self::ServerClosed { code: None, .. } => write!(f, "closed by server"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::TransportError(e) => write!(f, "transport error: {}", e),
            Self::DecodeFailed(e) => write!(f, "decode failed: {}", e),
        }
    }
}

/// Counters for one finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_received: u64,
    pub messages_rendered: u64,
    pub decode_errors: u64,
    pub close_reason: CloseReason,
}

/// Factory for feed sessions
pub struct FeedClient;

impl FeedClient {
    /// Open a session to `ws://{host}/ws`.
    pub async fn connect(host: &str, policy: DecodePolicy) -> Result<FeedSession<WsStream>, ClientError> {
        Self::connect_url(&feed_url(host), policy).await
    }

    /// Open a session to an explicit WebSocket URL.
    pub async fn connect_url(url: &str, policy: DecodePolicy) -> Result<FeedSession<WsStream>, ClientError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|source| ClientError::Connect {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket handshake completed");

        Ok(FeedSession::new(stream, policy).with_url(url))
    }
}

/// One feed session. Owns its frame stream until [`FeedSession::run`]
/// consumes it.
pub struct FeedSession<S> {
    stream: S,
    policy: DecodePolicy,
    url: Option<String>,
}

impl<S> FeedSession<S>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    /// Wrap an already-open frame stream.
    pub fn new(stream: S, policy: DecodePolicy) -> Self {
        Self {
            stream,
            policy,
            url: None,
        }
    }

    fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Drive the session to completion, reporting every event to `observer`.
    #[tracing::instrument(
        name = "feed.session",
        skip(self, observer),
        fields(url = self.url.as_deref().unwrap_or("-"), policy = %self.policy)
    )]
    pub async fn run<O: FeedObserver>(mut self, mut observer: O) -> SessionSummary {
        let mut frames_received = 0u64;
        let mut messages_rendered = 0u64;
        let mut decode_errors = 0u64;

        tracing::info!("Connected.");
        observer.on_open();

        let close_reason = loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    break CloseReason::TransportError(e.to_string());
                }
                None => break CloseReason::StreamEnded,
            };

            if let Message::Close(frame) = &frame {
                break match frame {
                    Some(f) => CloseReason::ServerClosed {
                        code: Some(u16::from(f.code)),
                        reason: f.reason.as_str().to_string(),
                    },
                    None => CloseReason::ServerClosed {
                        code: None,
                        reason: String::new(),
                    },
                };
            }

            let Some(decoded) = decode_frame(&frame) else {
                continue;
            };
            frames_received += 1;

            match decoded {
                Ok(message) => {
                    tracing::info!(payload = %message.payload, "Message received");
                    observer.on_message(&message);
                    messages_rendered += 1;
                }
                Err(e) => {
                    decode_errors += 1;
                    tracing::warn!(error = %e, policy = %self.policy, "Failed to decode frame");
                    observer.on_decode_error(&e);
                    if self.policy == DecodePolicy::Terminate {
                        break CloseReason::DecodeFailed(e.to_string());
                    }
                }
            }
        };

        tracing::info!(
            reason = %close_reason,
            frames = frames_received,
            rendered = messages_rendered,
            decode_errors = decode_errors,
            "Connection is closed..."
        );
        observer.on_close(&close_reason);

        SessionSummary {
            frames_received,
            messages_rendered,
            decode_errors,
            close_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DecodeError, InboundMessage, OutputBuffer};
    use futures::stream;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[derive(Debug, PartialEq)]
    enum Event {
        Open,
        Message(String),
        DecodeError,
        Close,
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl FeedObserver for Recorder {
        fn on_open(&mut self) {
            self.events.push(Event::Open);
        }

        fn on_message(&mut self, message: &InboundMessage) {
            self.events.push(Event::Message(message.message.clone()));
        }

        fn on_decode_error(&mut self, _error: &DecodeError) {
            self.events.push(Event::DecodeError);
        }

        fn on_close(&mut self, _reason: &CloseReason) {
            self.events.push(Event::Close);
        }
    }

    fn text(s: &str) -> Result<Message, tungstenite::Error> {
        Ok(Message::Text(s.to_string().into()))
    }

    fn session(
        frames: Vec<Result<Message, tungstenite::Error>>,
        policy: DecodePolicy,
    ) -> FeedSession<impl Stream<Item = Result<Message, tungstenite::Error>> + Unpin> {
        FeedSession::new(stream::iter(frames), policy)
    }

    #[tokio::test]
    async fn test_open_precedes_messages_and_close_is_last() {
        let mut recorder = Recorder::default();
        let summary = session(
            vec![text(r#"{"message":"a"}"#), text(r#"{"message":"b"}"#)],
            DecodePolicy::Skip,
        )
        .run(&mut recorder)
        .await;

        assert_eq!(
            recorder.events,
            vec![
                Event::Open,
                Event::Message("a".into()),
                Event::Message("b".into()),
                Event::Close,
            ]
        );
        assert_eq!(summary.messages_rendered, 2);
        assert_eq!(summary.close_reason, CloseReason::StreamEnded);
    }

    #[tokio::test]
    async fn test_frames_render_in_order() {
        let mut output = OutputBuffer::new(10);
        session(
            vec![
                text(r#"{"message":"m1"}"#),
                text(r#"{"message":"m2"}"#),
                text(r#"{"message":"m3"}"#),
            ],
            DecodePolicy::Skip,
        )
        .run(&mut output)
        .await;

        assert_eq!(output.render(), "m1\r\nm2\r\nm3\r\n");
    }

    #[tokio::test]
    async fn test_invalid_frame_is_skipped() {
        let mut output = OutputBuffer::new(10);
        let summary = session(
            vec![
                text(r#"{"message":"before"}"#),
                text("{not json"),
                text(r#"{"message":"after"}"#),
            ],
            DecodePolicy::Skip,
        )
        .run(&mut output)
        .await;

        assert_eq!(output.render(), "before\r\nafter\r\n");
        assert_eq!(summary.frames_received, 3);
        assert_eq!(summary.decode_errors, 1);
    }

    #[tokio::test]
    async fn test_terminate_policy_ends_session() {
        let mut recorder = Recorder::default();
        let summary = session(
            vec![text("oops"), text(r#"{"message":"never"}"#)],
            DecodePolicy::Terminate,
        )
        .run(&mut recorder)
        .await;

        assert_eq!(
            recorder.events,
            vec![Event::Open, Event::DecodeError, Event::Close]
        );
        assert!(matches!(summary.close_reason, CloseReason::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn test_no_messages_after_close_frame() {
        let close = Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "bye".to_string().into(),
        }));
        let mut recorder = Recorder::default();
        let summary = session(
            vec![text(r#"{"message":"a"}"#), Ok(close), text(r#"{"message":"late"}"#)],
            DecodePolicy::Skip,
        )
        .run(&mut recorder)
        .await;

        assert_eq!(
            recorder.events,
            vec![Event::Open, Event::Message("a".into()), Event::Close]
        );
        assert_eq!(
            summary.close_reason,
            CloseReason::ServerClosed {
                code: Some(1001),
                reason: "bye".into()
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_closes_once() {
        let mut recorder = Recorder::default();
        let summary = session(
            vec![
                text(r#"{"message":"a"}"#),
                Err(tungstenite::Error::ConnectionClosed),
            ],
            DecodePolicy::Skip,
        )
        .run(&mut recorder)
        .await;

        let closes = recorder.events.iter().filter(|e| **e == Event::Close).count();
        assert_eq!(closes, 1);
        assert!(matches!(summary.close_reason, CloseReason::TransportError(_)));
    }

    #[tokio::test]
    async fn test_control_frames_produce_no_events() {
        let mut recorder = Recorder::default();
        let summary = session(
            vec![Ok(Message::Ping(Vec::new().into())), Ok(Message::Pong(Vec::new().into()))],
            DecodePolicy::Skip,
        )
        .run(&mut recorder)
        .await;

        assert_eq!(recorder.events, vec![Event::Open, Event::Close]);
        assert_eq!(summary.frames_received, 0);
    }

    #[test]
    fn test_decode_policy_from_str() {
        assert_eq!("skip".parse::<DecodePolicy>(), Ok(DecodePolicy::Skip));
        assert_eq!("Terminate".parse::<DecodePolicy>(), Ok(DecodePolicy::Terminate));
        assert!("retry".parse::<DecodePolicy>().is_err());
        assert_eq!(DecodePolicy::Terminate.to_string(), "terminate");
    }
}
