//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};

use crate::{infrastructure::connection::WebSocketConnection, ui::state::AppState};

/// Upgrade the request and hand the socket to the relay.
///
/// The member is admitted only after the upgrade has completed.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_failed_upgrade(|e| {
        tracing::warn!("WebSocket upgrade failed: {}", e);
    })
    .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    match state
        .relay
        .accept_connection(WebSocketConnection::new(socket))
        .await
    {
        Ok(member) => {
            tracing::info!("WebSocket client connected as '{}'", member.id());
        }
        Err(e) => {
            // The connection is dropped, which closes the socket
            tracing::error!("Failed to accept WebSocket client: {}", e);
        }
    }
}
