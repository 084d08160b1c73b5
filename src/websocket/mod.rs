mod handler;
mod message;

pub use handler::{is_origin_allowed, ws_handler, ws_shared_handler};
pub use message::{FeedFrame, OutboundMessage};
