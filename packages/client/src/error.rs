//! Error types for the relay client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket handshake could not be completed
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// The connection broke while the session was running
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The server sent a close frame
    #[error("Server closed the connection")]
    ServerClosed,

    /// Every reconnect attempt failed
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectExhausted(u32),
}

impl ClientError {
    /// Whether the session had connected before this error ended it.
    pub fn was_connected(&self) -> bool {
        matches!(self, Self::ConnectionLost(_) | Self::ServerClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        // テスト項目: エラーメッセージが原因を含む
        // given (前提条件):
        let connect = ClientError::Connect("refused".to_string());
        let exhausted = ClientError::ReconnectExhausted(5);

        // when (操作):
        let connect_msg = connect.to_string();
        let exhausted_msg = exhausted.to_string();

        // then (期待する結果):
        assert_eq!(connect_msg, "Failed to connect: refused");
        assert_eq!(exhausted_msg, "Failed to reconnect after 5 attempts");
    }
}
