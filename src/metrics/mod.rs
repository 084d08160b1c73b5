//! Prometheus metrics for the feed relay.
//!
//! - Connection metrics (opened, closed, active, session duration)
//! - Broadcast metrics (broadcasts, frames delivered, delivery failures)
//! - Inbound frame metrics
//! - Heartbeat metrics

mod helpers;

pub use helpers::{encode_metrics, BroadcastMetrics, HeartbeatMetrics, WsMessageMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "feed_relay";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Number of active WebSocket sessions
    pub static ref CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_connections_active", METRIC_PREFIX),
        "Number of active WebSocket sessions"
    ).unwrap();

    /// Number of distinct document ids with at least one session
    pub static ref DOCUMENTS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_documents_active", METRIC_PREFIX),
        "Number of document ids with at least one session"
    ).unwrap();

    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket sessions opened"
    ).unwrap();

    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket sessions closed"
    ).unwrap();

    pub static ref WS_CONNECTIONS_REJECTED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_rejected_total", METRIC_PREFIX),
        "Total WebSocket upgrades rejected by the origin check"
    ).unwrap();

    /// Session duration in seconds
    pub static ref WS_CONNECTION_DURATION: Histogram = register_histogram!(
        format!("{}_ws_connection_duration_seconds", METRIC_PREFIX),
        "WebSocket session duration",
        vec![1.0, 10.0, 60.0, 300.0, 1800.0, 3600.0, 14400.0]
    ).unwrap();

    // ============================================================================
    // Broadcast Metrics
    // ============================================================================

    /// Broadcasts by source (http, session)
    pub static ref BROADCASTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Total broadcasts",
        &["source"]
    ).unwrap();

    pub static ref FRAMES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_delivered_total", METRIC_PREFIX),
        "Total frames queued to sessions"
    ).unwrap();

    pub static ref FRAMES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_frames_failed_total", METRIC_PREFIX),
        "Total frames that could not be queued to a session"
    ).unwrap();

    // ============================================================================
    // Inbound Metrics
    // ============================================================================

    /// Frames received from sessions by kind (text, binary)
    pub static ref WS_MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        format!("{}_ws_messages_received_total", METRIC_PREFIX),
        "Total frames received from sessions",
        &["kind"]
    ).unwrap();

    // ============================================================================
    // Heartbeat Metrics
    // ============================================================================

    pub static ref HEARTBEATS_SENT: IntCounter = register_int_counter!(
        format!("{}_heartbeats_sent_total", METRIC_PREFIX),
        "Total heartbeat pings queued"
    ).unwrap();

    pub static ref STALE_CONNECTIONS_REMOVED: IntCounter = register_int_counter!(
        format!("{}_stale_connections_removed_total", METRIC_PREFIX),
        "Total sessions removed for inactivity"
    ).unwrap();
}
