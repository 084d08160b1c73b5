use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use feed_relay::config::Settings;
use feed_relay::connection_manager::ConnectionManager;
use feed_relay::server::{create_app, AppState};
use feed_relay::tasks::HeartbeatTask;
use feed_relay::telemetry::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info", LogFormat::from_env());

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!(debug = settings.server.debug, "Configuration loaded");

    let state = AppState::new(settings.clone());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start heartbeat task in background
    let heartbeat_task = HeartbeatTask::new(
        settings.websocket.clone(),
        state.connection_manager.clone(),
        shutdown_tx.subscribe(),
    );
    let heartbeat_handle = tokio::spawn(async move {
        heartbeat_task.run().await;
    });

    let connection_manager = state.connection_manager.clone();
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx, connection_manager))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    let _ = heartbeat_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(
    shutdown_tx: broadcast::Sender<()>,
    connection_manager: Arc<ConnectionManager>,
) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // WebSocket sessions would otherwise hold the server open
    let closed = connection_manager.close_all().await;
    tracing::info!(sessions = closed, "Asked open sessions to close");

    let _ = shutdown_tx.send(());
}
