//! 接続アダプタの実装
//!
//! ## 概要
//!
//! このモジュールは `Connection` / `FrameSource` / `FrameSink` trait の具体的な実装を提供します。
//!
//! ## 実装
//!
//! - `websocket`: axum の WebSocket を使った実装（本番用）
//! - `memory`: プロセス内のチャネルを使った実装（テスト用のピア）

pub mod memory;
pub mod websocket;

pub use memory::{InMemoryConnection, InMemoryPeer, PeerEvent};
pub use websocket::WebSocketConnection;
