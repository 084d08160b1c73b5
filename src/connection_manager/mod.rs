//! Registry of live WebSocket sessions.

mod registry;
mod stats;
mod types;

pub use registry::{BroadcastResult, ConnectionManager};
pub use stats::{ConnectionStats};
pub use types::ConnectionHandle;
