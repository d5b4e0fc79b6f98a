//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::relay::Relay;

use super::{
    handler::{get_members, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Result type of the server entry points
pub type ServerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// WebSocket broadcast relay server
///
/// This struct wires the HTTP routes to a running [`Relay`] and provides
/// methods to run the server.
///
/// # Example
///
/// ```ignore
/// let relay = Relay::start(RelayConfig::default());
/// let server = Server::new(relay);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// Relay（ブロードキャスト中継の入口）
    relay: Relay,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `relay` - Relay whose registry every accepted connection joins
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            relay: self.relay.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/members", get(get_members))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the relay server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> ServerResult {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "WebSocket relay server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// # Errors
    ///
    /// Returns an error if accepting connections fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
