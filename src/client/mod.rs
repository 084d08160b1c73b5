//! Feed client: one WebSocket session to a relay, rendered into a bounded
//! output region.
//!
//! ```no_run
//! # async fn demo() -> Result<(), feed_relay::client::ClientError> {
//! use feed_relay::client::{DecodePolicy, FeedClient, OutputBuffer};
//!
//! let session = FeedClient::connect("localhost:8080", DecodePolicy::Skip).await?;
//! let mut output = OutputBuffer::new(100);
//! let summary = session.run(&mut output).await;
//! println!("{}", output.render());
//! # let _ = summary;
//! # Ok(())
//! # }
//! ```

mod decode;
mod observer;
mod output;
mod session;
mod target;

pub use decode::{decode_frame, decode_payload, DecodeError, InboundMessage};
pub use observer::FeedObserver;
pub use output::{OutputBuffer, LINE_BREAK};
pub use session::{
    ClientError, CloseReason, DecodePolicy, FeedClient, FeedSession, SessionSummary, WsStream,
};
pub use target::{feed_url, shared_feed_url};
