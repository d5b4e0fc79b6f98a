//! Server state shared by the handlers.

use crate::relay::Relay;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay（ブロードキャスト中継の入口）
    pub relay: Relay,
}
