//! Shell server lifecycle: bind, spawn the axum server in the background,
//! return a handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::shell::context::ShellContext;
use crate::shell::router::build_shell_router;

/// Handle to a running shell server.
pub struct ShellServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ShellServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Ask the server to stop accepting connections.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Shell server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Shell server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the shell router in a background task.
///
/// Port 0 picks an ephemeral port; the bound address is on the handle.
pub async fn start_shell_server(
    addr: SocketAddr,
    ctx: ShellContext,
) -> Result<ShellServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind shell server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = build_shell_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Shell server received shutdown signal");
        };

        tracing::info!(%addr, "Shell server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Shell server error: {e}");
        }

        tracing::info!("Shell server stopped");
    });

    Ok(ShellServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::prediction::MockPredictionClient;

    fn test_ctx() -> ShellContext {
        ShellContext::new(Arc::new(MockPredictionClient::new(json!({}))))
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let mut server = start_shell_server(loopback(), test_ctx())
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        // No pooled keep-alive, so graceful shutdown has nothing to wait on.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap();
        let resp = client
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");

        server.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), server.stopped())
            .await
            .expect("server should stop");
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let server = start_shell_server(loopback(), test_ctx()).await.unwrap();
        let err = match start_shell_server(server.addr, test_ctx()).await {
            Ok(_) => panic!("second bind on the same port should fail"),
            Err(e) => e,
        };
        assert!(err.contains("Failed to bind"));
    }

    #[tokio::test]
    async fn shutdown_twice_is_harmless() {
        let mut server = start_shell_server(loopback(), test_ctx()).await.unwrap();
        server.shutdown();
        server.shutdown();
    }
}
