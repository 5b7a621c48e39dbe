//! API server lifecycle: bind, spawn the axum server in a background
//! task, and hand back a handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    pub started_at: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Signal graceful shutdown. In-flight requests run to completion.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` (port 0 picks an ephemeral port) and serve in the background.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> std::io::Result<ApiServer> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let app = api_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Serve until Ctrl-C, then shut down gracefully.
pub async fn serve(ctx: ApiContext, addr: SocketAddr) -> std::io::Result<()> {
    let mut server = start_server_on(ctx, addr).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
