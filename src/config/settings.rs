use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::client::DecodePolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Accept WebSocket upgrades from any origin
    #[serde(default = "default_debug")]
    pub debug: bool,
    /// Origin host suffixes accepted when `debug` is off
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Heartbeat interval in seconds (server sends ping)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    /// Connection timeout in seconds (disconnect if no activity)
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Cleanup task interval in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Host (and optional port) the feed client connects to
    #[serde(default = "default_client_host")]
    pub host: String,
    /// Number of rendered lines kept in the output region
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub on_decode_error: DecodePolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_debug() -> bool {
    true
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_heartbeat_interval() -> u64 {
    30 // 30 seconds
}

fn default_connection_timeout() -> u64 {
    120 // 2 minutes
}

fn default_cleanup_interval() -> u64 {
    60 // 1 minute
}

fn default_client_host() -> String {
    "localhost:8080".to_string()
}

fn default_capacity() -> usize {
    1000
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.debug", default_debug())?
            .set_default("server.static_dir", default_static_dir())?
            .set_default("websocket.heartbeat_interval", default_heartbeat_interval() as i64)?
            .set_default("websocket.connection_timeout", default_connection_timeout() as i64)?
            .set_default("websocket.cleanup_interval", default_cleanup_interval() as i64)?
            .set_default("client.host", default_client_host())?
            .set_default("client.capacity", default_capacity() as i64)?
            .set_default("client.on_decode_error", "skip")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, SERVER__DEBUG, SERVER__ALLOWED_ORIGINS, CLIENT__CAPACITY, ...
            // Double underscore because several keys contain a single one.
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: default_debug(),
            allowed_origins: vec![],
            static_dir: default_static_dir(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            connection_timeout: default_connection_timeout(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_client_host(),
            capacity: default_capacity(),
            on_decode_error: DecodePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
        assert!(server.debug);
        assert!(server.allowed_origins.is_empty());

        let client = ClientConfig::default();
        assert_eq!(client.capacity, 1000);
        assert_eq!(client.on_decode_error, DecodePolicy::Skip);
    }

    #[test]
    fn test_server_addr() {
        let mut settings = Settings::default();
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 9000;
        assert_eq!(settings.server_addr(), "127.0.0.1:9000");
    }
}
