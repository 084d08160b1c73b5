//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BROADCASTS_TOTAL, FRAMES_DELIVERED_TOTAL, FRAMES_FAILED_TOTAL, HEARTBEATS_SENT,
    STALE_CONNECTIONS_REMOVED, WS_MESSAGES_RECEIVED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording broadcast metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record a broadcast triggered through the HTTP API
    pub fn record_http() {
        BROADCASTS_TOTAL.with_label_values(&["http"]).inc();
    }

    /// Record a broadcast triggered by a session frame
    pub fn record_session() {
        BROADCASTS_TOTAL.with_label_values(&["session"]).inc();
    }

    pub fn record_delivery(delivered: usize, failed: usize) {
        FRAMES_DELIVERED_TOTAL.inc_by(delivered as u64);
        FRAMES_FAILED_TOTAL.inc_by(failed as u64);
    }
}

/// Helper struct for inbound WebSocket frame metrics
pub struct WsMessageMetrics;

impl WsMessageMetrics {
    pub fn record_text() {
        WS_MESSAGES_RECEIVED.with_label_values(&["text"]).inc();
    }

    pub fn record_binary() {
        WS_MESSAGES_RECEIVED.with_label_values(&["binary"]).inc();
    }
}

/// Helper struct for heartbeat metrics
pub struct HeartbeatMetrics;

impl HeartbeatMetrics {
    pub fn record_sent(count: usize) {
        HEARTBEATS_SENT.inc_by(count as u64);
    }

    pub fn record_stale_removed(count: usize) {
        STALE_CONNECTIONS_REMOVED.inc_by(count as u64);
    }
}
