use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::config::WebSocketConfig;
use crate::connection_manager::ConnectionManager;
use crate::metrics::HeartbeatMetrics;
use crate::websocket::OutboundMessage;

/// Timeout for individual heartbeat send operations
const HEARTBEAT_SEND_TIMEOUT_MS: u64 = 5000;

/// Maximum concurrent heartbeat sends to avoid overwhelming the system
const MAX_CONCURRENT_HEARTBEATS: usize = 1000;

/// Background task for heartbeat and stale session cleanup
pub struct HeartbeatTask {
    config: WebSocketConfig,
    connection_manager: Arc<ConnectionManager>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: WebSocketConfig,
        connection_manager: Arc<ConnectionManager>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            connection_manager,
            shutdown,
        }
    }

    /// Run the heartbeat and cleanup loops until shutdown
    pub async fn run(mut self) {
        let heartbeat_interval = Duration::from_secs(self.config.heartbeat_interval.max(1));
        let cleanup_interval = Duration::from_secs(self.config.cleanup_interval.max(1));
        let connection_timeout = self.config.connection_timeout;

        let mut heartbeat_timer = tokio::time::interval(heartbeat_interval);
        let mut cleanup_timer = tokio::time::interval(cleanup_interval);

        // Skip immediate first tick
        heartbeat_timer.tick().await;
        cleanup_timer.tick().await;

        tracing::info!(
            heartbeat_interval_secs = self.config.heartbeat_interval,
            cleanup_interval_secs = self.config.cleanup_interval,
            connection_timeout_secs = connection_timeout,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.send_heartbeats().await;
                }
                _ = cleanup_timer.tick() => {
                    self.cleanup_stale_connections(connection_timeout).await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// Queue a ping on every session, in batches
    async fn send_heartbeats(&self) {
        let connections = self.connection_manager.get_all_connections();
        let total = connections.len();

        if total == 0 {
            return;
        }

        let start = Instant::now();
        let send_timeout = Duration::from_millis(HEARTBEAT_SEND_TIMEOUT_MS);
        let mut sent = 0;

        for batch in connections.chunks(MAX_CONCURRENT_HEARTBEATS) {
            let sends = batch.iter().map(|handle| async move {
                match timeout(send_timeout, handle.send_outbound(OutboundMessage::Ping)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(_)) => {
                        tracing::debug!(
                            connection_id = %handle.id,
                            "Failed to send heartbeat, connection may be dead"
                        );
                        false
                    }
                    Err(_) => {
                        tracing::debug!(
                            connection_id = %handle.id,
                            timeout_ms = HEARTBEAT_SEND_TIMEOUT_MS,
                            "Heartbeat send timed out"
                        );
                        false
                    }
                }
            });

            sent += join_all(sends).await.into_iter().filter(|ok| *ok).count();
        }

        HeartbeatMetrics::record_sent(sent);

        tracing::debug!(
            total = total,
            sent = sent,
            failed = total - sent,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Heartbeat round completed"
        );
    }

    async fn cleanup_stale_connections(&self, timeout_secs: u64) {
        let removed = self
            .connection_manager
            .cleanup_stale_connections(timeout_secs)
            .await;

        if removed > 0 {
            HeartbeatMetrics::record_stale_removed(removed);
            tracing::info!(
                removed = removed,
                timeout_secs = timeout_secs,
                "Cleaned up stale connections"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_heartbeat_task_shutdown() {
        let config = WebSocketConfig::default();
        let connection_manager = Arc::new(ConnectionManager::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = HeartbeatTask::new(config, connection_manager, shutdown_rx);

        let handle = tokio::spawn(async move {
            task.run().await;
        });

        // Wait a bit then send shutdown
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }

    #[tokio::test]
    async fn test_heartbeat_sends_ping_to_connections() {
        let config = WebSocketConfig {
            heartbeat_interval: 1,
            connection_timeout: 60,
            cleanup_interval: 60,
        };
        let connection_manager = Arc::new(ConnectionManager::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let (tx, mut rx) = mpsc::channel::<OutboundMessage>(10);
        let _handle = connection_manager.register("doc".to_string(), tx);

        let task = HeartbeatTask::new(config, connection_manager, shutdown_rx);
        let task_handle = tokio::spawn(async move {
            task.run().await;
        });

        let msg = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("Should receive heartbeat")
            .expect("Channel should not be closed");

        assert!(matches!(msg, OutboundMessage::Ping));

        shutdown_tx.send(()).unwrap();
        let _ = task_handle.await;
    }
}
