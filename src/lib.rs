// Supporting modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Feed client
pub mod client;

// Relay server
pub mod api;
pub mod connection_manager;
pub mod server;
pub mod tasks;
pub mod websocket;
