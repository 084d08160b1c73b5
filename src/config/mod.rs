mod settings;

pub use settings::{ClientConfig, ServerConfig, Settings, WebSocketConfig};
